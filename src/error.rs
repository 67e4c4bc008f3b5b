use thiserror::Error;

// Define our own Result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // External library errors with automatic conversion
    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    // Configuration errors with location info
    #[error("Configuration error at {location}: {message}. {suggestion}")]
    Config {
        message: String,
        location: String,
        suggestion: String,
    },

    // Container-related errors
    #[error("Container '{id}' not found")]
    ContainerNotFound { id: String },

    // Label parsing errors
    #[error("Invalid IP address or range: {input} - {reason}")]
    InvalidIpAddress { input: String, reason: String },

    #[error("Invalid container label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    // Timeout errors with operation context
    #[error("Timeout after {duration:?} while {operation}")]
    Timeout {
        duration: std::time::Duration,
        operation: String,
    },

    #[error("Invalid state: {message} (current: {current_state}, expected: {expected_state})")]
    InvalidState {
        message: String,
        current_state: String,
        expected_state: String,
    },

    #[error("Channel '{channel}' is closed")]
    ChannelClosed { channel: String },

    // Module-specific errors
    #[error(transparent)]
    DockerModule(#[from] crate::docker::error::DockerError),

    #[error(transparent)]
    UfwModule(#[from] crate::ufw::error::UfwError),
}

// Helper methods for creating errors with context
impl Error {
    pub fn config_with_suggestion(
        message: impl Into<String>,
        location: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            location: location.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn container_not_found(id: impl Into<String>) -> Self {
        Self::ContainerNotFound { id: id.into() }
    }

    pub fn invalid_ip(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIpAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_label(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(duration: std::time::Duration, operation: impl Into<String>) -> Self {
        Self::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    pub fn invalid_state(
        message: impl Into<String>,
        current: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            message: message.into(),
            current_state: current.into(),
            expected_state: expected.into(),
        }
    }

    pub fn channel_closed(channel: impl Into<String>) -> Self {
        Self::ChannelClosed {
            channel: channel.into(),
        }
    }

    /// True when the runtime reported that a container does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ContainerNotFound { .. } => true,
            Self::Docker(bollard::errors::Error::DockerResponseServerError {
                status_code, ..
            }) => *status_code == 404,
            _ => false,
        }
    }
}
