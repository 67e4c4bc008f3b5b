use std::io::Error as IoError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UfwError {
    #[error("Failed to execute ufw command '{program}'")]
    Execution {
        program: String,
        #[source]
        inner: IoError,
    },

    #[error(
        "ufw command '{command}' failed (exit code {}): {}",
        .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
        .stderr.trim()
    )]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("ufw command '{command}' timed out after {duration:?}")]
    Timeout { command: String, duration: Duration },
}

impl UfwError {
    pub fn execution(program: impl Into<String>, error: IoError) -> Self {
        Self::Execution {
            program: program.into(),
            inner: error,
        }
    }

    /// Combined output of a failed command, for matching well-known messages.
    pub fn output(&self) -> Option<String> {
        match self {
            Self::CommandFailed { stdout, stderr, .. } => Some(format!("{}{}", stdout, stderr)),
            _ => None,
        }
    }
}
