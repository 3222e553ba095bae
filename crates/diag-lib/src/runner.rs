//! External command execution
//!
//! The collectors never implement the tools they inspect; they run them and
//! keep whatever they print. A runner abstraction keeps the pipelines
//! testable without the real binaries.

use crate::error::Result;
use std::path::Path;
use std::process::Stdio;
use tracing::{debug, warn};

pub use async_trait::async_trait;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, as an operator would see them
    pub fn combined(&self) -> Vec<u8> {
        let mut combined = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        combined.extend_from_slice(&self.stdout);
        combined.extend_from_slice(&self.stderr);
        combined
    }
}

/// Trait for running external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion and capture its output
    ///
    /// Errors only when the process cannot be started. A nonzero exit is a
    /// normal result.
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Runs commands on the local host via tokio
///
/// No timeout is applied; a hung CLI blocks the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        debug!(program = %program, args = ?args, "Running command");

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Run a command and write its combined output to `path`
///
/// The exit code never aborts collection. A command that cannot be started
/// leaves its error text in the file. Returns whether the command succeeded.
pub async fn capture_to_file(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    path: &Path,
) -> Result<bool> {
    match runner.run(program, args).await {
        Ok(output) => {
            tokio::fs::write(path, output.combined()).await?;
            if !output.success() {
                warn!(
                    program = %program,
                    args = ?args,
                    exit_code = ?output.exit_code,
                    file = %path.display(),
                    "Command exited with failure, output kept"
                );
            }
            Ok(output.success())
        }
        Err(e) => {
            let message = format!("failed to run {} {}: {}\n", program, args.join(" "), e);
            tokio::fs::write(path, message.as_bytes()).await?;
            warn!(
                program = %program,
                error = %e,
                file = %path.display(),
                "Command could not be started"
            );
            Ok(false)
        }
    }
}
