//! Dependency bootstrap for required CLIs
//!
//! Detection and installation are separate steps. Detection maps the host
//! to a package manager through a platform check followed by an ordered
//! distribution table; installation is a plan of commands executed through
//! a [`CommandRunner`].

use crate::error::{DiagError, Result};
use crate::runner::CommandRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Finds executables on the host
pub trait ToolLocator: Send + Sync {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks executables up on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Platform facts used to pick an installer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Platform identifier as reported by `std::env::consts::OS`
    pub os: String,
    /// Lowercased `ID` and `ID_LIKE` values from os-release
    pub distro: Option<String>,
}

impl HostInfo {
    /// Detect the current host
    pub fn detect() -> Self {
        let os = std::env::consts::OS.to_string();
        let distro = if os == "linux" {
            std::fs::read_to_string(OS_RELEASE_PATH)
                .ok()
                .and_then(|content| parse_os_release(&content))
        } else {
            None
        };

        Self { os, distro }
    }
}

/// Extract the distribution identifiers from os-release content
pub fn parse_os_release(content: &str) -> Option<String> {
    let ids: Vec<String> = content
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .filter(|(key, _)| *key == "ID" || *key == "ID_LIKE")
        .map(|(_, value)| value.trim().trim_matches('"').trim_matches('\'').to_lowercase())
        .filter(|value| !value.is_empty())
        .collect();

    if ids.is_empty() {
        None
    } else {
        Some(ids.join(" "))
    }
}

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Homebrew,
    Apt,
    Yum,
    Dnf,
}

/// Distribution substrings in match order
const DISTRO_TABLE: &[(&str, PackageManager)] = &[
    ("ubuntu", PackageManager::Apt),
    ("debian", PackageManager::Apt),
    ("amzn", PackageManager::Yum),
    ("rhel", PackageManager::Yum),
    ("centos", PackageManager::Yum),
    ("rocky", PackageManager::Yum),
    ("almalinux", PackageManager::Yum),
    // RHEL derivatives list fedora in ID_LIKE, so it must come last
    ("fedora", PackageManager::Dnf),
];

/// Pick a package manager for the host
pub fn detect_package_manager(host: &HostInfo) -> Result<PackageManager> {
    match host.os.as_str() {
        "macos" => Ok(PackageManager::Homebrew),
        "linux" => {
            let distro = host
                .distro
                .as_deref()
                .ok_or_else(|| DiagError::UnsupportedPlatform("linux (unknown distribution)".into()))?;

            DISTRO_TABLE
                .iter()
                .find(|(needle, _)| distro.contains(needle))
                .map(|(_, manager)| *manager)
                .ok_or_else(|| DiagError::UnsupportedPlatform(format!("linux ({})", distro)))
        }
        other => Err(DiagError::UnsupportedPlatform(other.to_string())),
    }
}

/// One command of an installation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub program: String,
    pub args: Vec<String>,
}

impl InstallStep {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn shell(script: &str) -> Self {
        Self::new("sh", &["-c", script])
    }
}

impl PackageManager {
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Homebrew => "homebrew",
            PackageManager::Apt => "apt",
            PackageManager::Yum => "yum",
            PackageManager::Dnf => "dnf",
        }
    }

    /// Commands that add the HashiCorp repository and install `tool`
    pub fn install_steps(&self, tool: &str) -> Vec<InstallStep> {
        match self {
            PackageManager::Homebrew => vec![
                InstallStep::new("brew", &["tap", "hashicorp/tap"]),
                InstallStep::new("brew", &["install", &format!("hashicorp/tap/{}", tool)]),
            ],
            PackageManager::Apt => vec![
                InstallStep::shell(
                    "curl -fsSL https://apt.releases.hashicorp.com/gpg | sudo gpg --dearmor --yes -o /usr/share/keyrings/hashicorp-archive-keyring.gpg",
                ),
                InstallStep::shell(
                    "echo \"deb [signed-by=/usr/share/keyrings/hashicorp-archive-keyring.gpg] https://apt.releases.hashicorp.com $(lsb_release -cs) main\" | sudo tee /etc/apt/sources.list.d/hashicorp.list",
                ),
                InstallStep::new("sudo", &["apt-get", "update"]),
                InstallStep::new("sudo", &["apt-get", "install", "-y", tool]),
            ],
            PackageManager::Yum => vec![
                InstallStep::new("sudo", &["yum", "install", "-y", "yum-utils"]),
                InstallStep::new(
                    "sudo",
                    &[
                        "yum-config-manager",
                        "--add-repo",
                        "https://rpm.releases.hashicorp.com/RHEL/hashicorp.repo",
                    ],
                ),
                InstallStep::new("sudo", &["yum", "-y", "install", tool]),
            ],
            PackageManager::Dnf => vec![
                InstallStep::new("sudo", &["dnf", "install", "-y", "dnf-plugins-core"]),
                InstallStep::new(
                    "sudo",
                    &[
                        "dnf",
                        "config-manager",
                        "--add-repo",
                        "https://rpm.releases.hashicorp.com/fedora/hashicorp.repo",
                    ],
                ),
                InstallStep::new("sudo", &["dnf", "-y", "install", tool]),
            ],
        }
    }
}

/// True when `tool` names a file path rather than a command on `PATH`
fn is_explicit_path(tool: &str) -> bool {
    Path::new(tool).components().count() > 1
}

/// Ensures a CLI is present, installing it when missing
pub struct Bootstrapper {
    runner: Arc<dyn CommandRunner>,
    locator: Arc<dyn ToolLocator>,
    host: HostInfo,
}

impl Bootstrapper {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        locator: Arc<dyn ToolLocator>,
        host: HostInfo,
    ) -> Self {
        Self {
            runner,
            locator,
            host,
        }
    }

    /// Bootstrapper for the current host using `PATH` lookup
    pub fn for_host(runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(runner, Arc::new(PathLocator), HostInfo::detect())
    }

    /// Make sure `tool` is available, returning its path
    ///
    /// A no-op when the tool is already present. An explicit path is never
    /// installed; it must already exist.
    pub async fn ensure(&self, tool: &str) -> Result<PathBuf> {
        if let Some(path) = self.locator.locate(tool) {
            debug!(tool = %tool, path = %path.display(), "Dependency already installed");
            return Ok(path);
        }

        if is_explicit_path(tool) {
            return Err(DiagError::InstallFailed {
                tool: tool.to_string(),
                reason: format!("{} does not exist or is not executable", tool),
            });
        }

        let manager = detect_package_manager(&self.host)?;
        info!(
            tool = %tool,
            os = %self.host.os,
            distro = ?self.host.distro,
            package_manager = manager.name(),
            "Dependency missing, installing"
        );

        for step in manager.install_steps(tool) {
            let output = self
                .runner
                .run(&step.program, &step.args)
                .await
                .map_err(|e| DiagError::InstallFailed {
                    tool: tool.to_string(),
                    reason: format!("could not run {}: {}", step.program, e),
                })?;

            if !output.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(
                    tool = %tool,
                    program = %step.program,
                    args = ?step.args,
                    exit_code = ?output.exit_code,
                    "Install step failed"
                );
                return Err(DiagError::InstallFailed {
                    tool: tool.to_string(),
                    reason: format!(
                        "{} {} exited with {:?}: {}",
                        step.program,
                        step.args.join(" "),
                        output.exit_code,
                        stderr
                    ),
                });
            }
        }

        self.locator
            .locate(tool)
            .ok_or_else(|| DiagError::InstallFailed {
                tool: tool.to_string(),
                reason: format!("{} not found on PATH after installation", tool),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{async_trait, CommandOutput};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail_program: Option<String>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            let exit_code = if self.fail_program.as_deref() == Some(program) {
                1
            } else {
                0
            };
            Ok(CommandOutput {
                exit_code: Some(exit_code),
                ..Default::default()
            })
        }
    }

    /// Locator that reports the tool present once `installed` is set
    struct FlagLocator {
        installed: AtomicBool,
        install_on_lookup: bool,
    }

    impl ToolLocator for FlagLocator {
        fn locate(&self, name: &str) -> Option<PathBuf> {
            if self.installed.load(Ordering::SeqCst) {
                return Some(PathBuf::from(format!("/usr/local/bin/{}", name)));
            }
            if self.install_on_lookup {
                self.installed.store(true, Ordering::SeqCst);
            }
            None
        }
    }

    fn host(os: &str, distro: Option<&str>) -> HostInfo {
        HostInfo {
            os: os.to_string(),
            distro: distro.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_os_release() {
        let content = r#"NAME="Ubuntu"
VERSION="22.04.3 LTS (Jammy Jellyfish)"
ID=ubuntu
ID_LIKE=debian
PRETTY_NAME="Ubuntu 22.04.3 LTS"
"#;
        assert_eq!(parse_os_release(content), Some("ubuntu debian".to_string()));

        let rhel = "ID=\"rhel\"\nID_LIKE=\"fedora\"\n";
        assert_eq!(parse_os_release(rhel), Some("rhel fedora".to_string()));

        assert_eq!(parse_os_release("NAME=Unknown\n"), None);
    }

    #[test]
    fn test_detect_by_platform_then_distro() {
        assert_eq!(
            detect_package_manager(&host("macos", None)).unwrap(),
            PackageManager::Homebrew
        );
        assert_eq!(
            detect_package_manager(&host("linux", Some("ubuntu debian"))).unwrap(),
            PackageManager::Apt
        );
        assert_eq!(
            detect_package_manager(&host("linux", Some("fedora"))).unwrap(),
            PackageManager::Dnf
        );
        assert_eq!(
            detect_package_manager(&host("linux", Some("amzn rhel fedora"))).unwrap(),
            PackageManager::Yum
        );
        assert_eq!(
            detect_package_manager(&host("linux", Some("rocky rhel centos fedora"))).unwrap(),
            PackageManager::Yum
        );
    }

    #[test]
    fn test_detect_unsupported() {
        assert!(matches!(
            detect_package_manager(&host("windows", None)),
            Err(DiagError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            detect_package_manager(&host("linux", Some("arch"))),
            Err(DiagError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            detect_package_manager(&host("linux", None)),
            Err(DiagError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_install_steps_end_with_tool_install() {
        for manager in [
            PackageManager::Homebrew,
            PackageManager::Apt,
            PackageManager::Yum,
            PackageManager::Dnf,
        ] {
            let steps = manager.install_steps("consul-k8s");
            let last = steps.last().unwrap();
            assert!(
                last.args.iter().any(|a| a.ends_with("consul-k8s")),
                "{} plan should install the tool",
                manager.name()
            );
        }
    }

    #[tokio::test]
    async fn test_ensure_is_noop_when_present() {
        let runner = Arc::new(RecordingRunner::default());
        let locator = Arc::new(FlagLocator {
            installed: AtomicBool::new(true),
            install_on_lookup: false,
        });
        let bootstrapper = Bootstrapper::new(runner.clone(), locator, host("linux", Some("ubuntu")));

        let path = bootstrapper.ensure("consul-k8s").await.unwrap();

        assert_eq!(path, PathBuf::from("/usr/local/bin/consul-k8s"));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_installs_missing_tool() {
        let runner = Arc::new(RecordingRunner::default());
        let locator = Arc::new(FlagLocator {
            installed: AtomicBool::new(false),
            install_on_lookup: true,
        });
        let bootstrapper = Bootstrapper::new(runner.clone(), locator, host("macos", None));

        bootstrapper.ensure("consul-k8s").await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "brew");
        assert_eq!(calls[1].1, vec!["install", "hashicorp/tap/consul-k8s"]);
    }

    #[tokio::test]
    async fn test_ensure_stops_on_failed_step() {
        let runner = Arc::new(RecordingRunner {
            fail_program: Some("brew".to_string()),
            ..Default::default()
        });
        let locator = Arc::new(FlagLocator {
            installed: AtomicBool::new(false),
            install_on_lookup: false,
        });
        let bootstrapper = Bootstrapper::new(runner.clone(), locator, host("macos", None));

        let err = bootstrapper.ensure("consul-k8s").await.unwrap_err();

        assert!(matches!(err, DiagError::InstallFailed { .. }));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_fails_when_still_missing() {
        let runner = Arc::new(RecordingRunner::default());
        let locator = Arc::new(FlagLocator {
            installed: AtomicBool::new(false),
            install_on_lookup: false,
        });
        let bootstrapper = Bootstrapper::new(runner, locator, host("linux", Some("fedora")));

        let err = bootstrapper.ensure("consul-k8s").await.unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[tokio::test]
    async fn test_ensure_unsupported_platform_runs_nothing() {
        let runner = Arc::new(RecordingRunner::default());
        let locator = Arc::new(FlagLocator {
            installed: AtomicBool::new(false),
            install_on_lookup: false,
        });
        let bootstrapper = Bootstrapper::new(runner.clone(), locator, host("freebsd", None));

        let err = bootstrapper.ensure("consul-k8s").await.unwrap_err();
        assert!(matches!(err, DiagError::UnsupportedPlatform(_)));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_never_installs_explicit_path() {
        let runner = Arc::new(RecordingRunner::default());
        let locator = Arc::new(FlagLocator {
            installed: AtomicBool::new(false),
            install_on_lookup: true,
        });
        let bootstrapper = Bootstrapper::new(runner.clone(), locator, host("macos", None));

        let err = bootstrapper.ensure("/opt/bin/consul-k8s").await.unwrap_err();

        match err {
            DiagError::InstallFailed { tool, reason } => {
                assert_eq!(tool, "/opt/bin/consul-k8s");
                assert!(reason.contains("does not exist"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_explicit_path_detection() {
        assert!(is_explicit_path("/opt/bin/consul-k8s"));
        assert!(is_explicit_path("./consul-k8s"));
        assert!(!is_explicit_path("consul-k8s"));
    }
}
