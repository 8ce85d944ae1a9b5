//! Error types for the command executor
//!
//! ExecError는 예외가 아니라 데이터다. 게이트는 항상 이 값을 응답으로 변환할 수 있다.

use thiserror::Error;

/// Errors returned by [`CommandExecutor::execute`](super::CommandExecutor::execute)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Empty command line
    #[error("Empty command")]
    EmptyCommand,

    /// Denylisted command, no process was spawned
    #[error("Command '{0}' is forbidden")]
    Forbidden(String),

    /// Command line could not be tokenized
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Bad `cd` target, cursor unchanged
    #[error("Cannot change directory: {0}")]
    DirectoryError(String),

    /// Non-zero exit or spawn failure
    #[error("Command failed: {0}")]
    ProcessError(String),
}

impl ExecError {
    /// Refused before anything ran, the cursor is unchanged
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::EmptyCommand
                | Self::Forbidden(_)
                | Self::InvalidCommand(_)
                | Self::DirectoryError(_)
        )
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Forbidden(cmd) => format!("Command '{}' is forbidden", cmd),
            Self::ProcessError(msg) => format!("Error executing command: {}", msg),
            _ => self.to_string(),
        }
    }
}

/// Command execution result with detailed info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The command line that was executed
    pub command: String,

    /// Exit code (None for the `cd` pseudo-command or a signal kill)
    pub exit_code: Option<i32>,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Whether captured output was cut at source
    pub truncated: bool,
}

impl CommandOutput {
    /// Get combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n--- stderr ---\n{}", self.stdout, self.stderr)
        }
    }

    /// Nothing was printed on either stream
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected() {
        assert!(ExecError::Forbidden("shutdown".into()).is_rejected());
        assert!(ExecError::EmptyCommand.is_rejected());
        assert!(ExecError::DirectoryError("nope".into()).is_rejected());
        assert!(!ExecError::ProcessError("boom".into()).is_rejected());
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            command: "make".into(),
            exit_code: Some(0),
            stdout: "built".into(),
            stderr: "warning: unused".into(),
            duration_ms: 5,
            truncated: false,
        };
        assert_eq!(output.combined_output(), "built\n--- stderr ---\nwarning: unused");
        assert!(!output.is_empty());
    }
}
