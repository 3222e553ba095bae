//! Superficial validation of captured profiles
//!
//! Profiles are opaque binary blobs; the only checks are that something was
//! written and that it is not a recognizable error page.

use crate::error::Result;
use crate::models::{ProfileRequest, ValidationResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Case-insensitive signatures of error responses
pub const FAILURE_MARKERS: &[&str] = &["stream timeout", "<html", "usage:"];

/// Return the first failure marker found in `data`
pub fn scan_for_markers(data: &[u8]) -> Option<&'static str> {
    FAILURE_MARKERS.iter().copied().find(|marker| {
        let needle = marker.as_bytes();
        data.windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle))
    })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Validate a written profile file
///
/// `http_status` is the status the agent answered with; anything outside
/// 2xx fails regardless of content.
pub async fn validate_profile(
    request: &ProfileRequest,
    path: &Path,
    http_status: u16,
) -> Result<ValidationResult> {
    let data = tokio::fs::read(path).await?;
    let size_bytes = data.len() as u64;

    let reason = if !(200..300).contains(&http_status) {
        Some(format!("agent returned HTTP {}", http_status))
    } else if data.is_empty() {
        Some("profile is empty".to_string())
    } else {
        scan_for_markers(&data).map(|marker| format!("response contains '{}'", marker))
    };

    Ok(ValidationResult {
        kind: request.kind,
        file: request.output_filename.to_string(),
        passed: reason.is_none(),
        reason,
        http_status: Some(http_status),
        size_bytes,
        sha256: (!data.is_empty()).then(|| compute_checksum(&data)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileKind;
    use tempfile::TempDir;

    fn heap_request() -> ProfileRequest {
        ProfileRequest::all(5).remove(0)
    }

    #[test]
    fn test_scan_for_markers_case_insensitive() {
        assert_eq!(scan_for_markers(b"error: Stream Timeout"), Some("stream timeout"));
        assert_eq!(scan_for_markers(b"<!DOCTYPE><HTML><body>"), Some("<html"));
        assert_eq!(scan_for_markers(b"Usage: consul [--version]"), Some("usage:"));
        assert_eq!(scan_for_markers(&[0x1f, 0x8b, 0x08, 0x00, 0xff]), None);
        assert_eq!(scan_for_markers(b""), None);
    }

    #[test]
    fn test_compute_checksum() {
        assert_eq!(
            compute_checksum(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_validate_passes_clean_profile() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("heap.prof");
        std::fs::write(&path, [0x1f, 0x8b, 0x08, 0x00, 0x01, 0x02]).unwrap();

        let result = validate_profile(&heap_request(), &path, 200).await.unwrap();

        assert!(result.passed);
        assert_eq!(result.kind, ProfileKind::Heap);
        assert_eq!(result.size_bytes, 6);
        assert!(result.sha256.is_some());
        assert!(result.reason.is_none());
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_profile() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("heap.prof");
        std::fs::write(&path, b"").unwrap();

        let result = validate_profile(&heap_request(), &path, 200).await.unwrap();

        assert!(!result.passed);
        assert_eq!(result.reason.as_deref(), Some("profile is empty"));
        assert!(result.sha256.is_none());
    }

    #[tokio::test]
    async fn test_validate_rejects_each_marker() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("heap.prof");

        for body in [
            "rpc error: stream timeout",
            "<html><body>404</body></html>",
            "Usage: go tool pprof",
        ] {
            std::fs::write(&path, body).unwrap();
            let result = validate_profile(&heap_request(), &path, 200).await.unwrap();
            assert!(!result.passed, "body {:?} should fail", body);
        }
    }

    #[tokio::test]
    async fn test_validate_rejects_error_status() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("heap.prof");
        std::fs::write(&path, b"Permission denied").unwrap();

        let result = validate_profile(&heap_request(), &path, 403).await.unwrap();

        assert!(!result.passed);
        assert_eq!(result.http_status, Some(403));
        assert!(result.reason.unwrap().contains("403"));
    }
}
