//! The unsafe primitive: a shell that runs whatever it is handed

use crate::error::{ToolError, ToolResult};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Session timeout applied by `BashSession`
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr in the layout shown to users
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            format!("STDERR:\n{}", self.stderr)
        } else {
            format!("STDOUT:\n{}\n\nSTDERR:\n{}", self.stdout, self.stderr)
        }
    }
}

/// Anything that can run a shell command string
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShellSession: Send + Sync {
    async fn run(&self, command: &str) -> ToolResult<CommandOutput>;
}

/// `bash -c` in a fixed working directory with a hard timeout
#[derive(Debug, Clone)]
pub struct BashSession {
    working_directory: PathBuf,
    timeout: Duration,
}

impl BashSession {
    pub fn new() -> Self {
        Self {
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_working_directory<P: Into<PathBuf>>(mut self, working_directory: P) -> Self {
        self.working_directory = working_directory.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for BashSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShellSession for BashSession {
    #[instrument(skip(self), fields(command_preview = %command.chars().take(50).collect::<String>()))]
    async fn run(&self, command: &str) -> ToolResult<CommandOutput> {
        let start_time = Instant::now();

        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                ToolError::ExecutionFailed(format!(
                    "Failed to execute command in '{}': {}",
                    self.working_directory.display(),
                    e
                ))
            })?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        debug!(exit_code = ?result.exit_code, duration_ms = result.duration_ms, "command finished");
        Ok(result)
    }
}
