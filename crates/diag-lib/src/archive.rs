//! Compressed archives of run directories

use crate::error::{DiagError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive path for a run directory: `<dir>.tar.gz` next to it
pub fn archive_path(dir: &Path) -> PathBuf {
    let mut name = dir.file_name().unwrap_or_default().to_os_string();
    name.push(".tar.gz");
    dir.with_file_name(name)
}

/// Pack `dir` into a gzip-compressed tarball rooted at the directory name
pub fn create_tar_gz(dir: &Path) -> Result<PathBuf> {
    let root_name = dir
        .file_name()
        .ok_or_else(|| {
            DiagError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot archive {}", dir.display()),
            ))
        })?
        .to_os_string();

    let path = archive_path(dir);
    debug!(source = %dir.display(), archive = %path.display(), "Creating archive");

    let file = File::create(&path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(&root_name, dir)?;
    builder.into_inner()?.finish()?;

    Ok(path)
}

/// Async wrapper running the archive on a blocking thread
pub async fn create_tar_gz_async(dir: PathBuf) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || create_tar_gz(&dir))
        .await
        .map_err(|e| DiagError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}
