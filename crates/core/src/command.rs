//! CommandRunner trait: the abstraction over local command execution.
//!
//! A runner always produces text. Missing directories, non-zero exits and
//! timeouts are described in the returned string because the result is fed
//! back to the model verbatim and the model decides how to react.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// A request to run one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// The command line handed to the shell
    pub command: String,

    /// Working directory; `None` means the current directory
    pub working_dir: Option<PathBuf>,

    /// Hard limit on the command's run time
    pub timeout: Duration,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            timeout,
        }
    }

    /// Set the working directory. An empty string keeps the current directory.
    pub fn in_dir(mut self, dir: &str) -> Self {
        self.working_dir = if dir.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(dir))
        };
        self
    }
}

/// Runs shell commands on behalf of the agent loop.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and return combined output or a descriptive failure.
    async fn run(&self, request: CommandRequest) -> String;
}
