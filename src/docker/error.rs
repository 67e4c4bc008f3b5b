use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    // Connection errors
    #[error("Failed to connect to Docker daemon at {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("Docker daemon not responding after {duration:?}")]
    DaemonNotResponding { duration: Duration },

    // Event stream errors
    #[error("Docker event stream closed")]
    EventStreamClosed,

    #[error("Docker event stream failed: {reason}")]
    EventStreamFailed {
        reason: String,
        #[source]
        source: bollard::errors::Error,
    },
}

impl DockerError {
    pub fn connection_failed(
        endpoint: impl Into<String>,
        source: bollard::errors::Error,
    ) -> Self {
        Self::ConnectionFailed {
            endpoint: endpoint.into(),
            reason: source.to_string(),
            source,
        }
    }

    pub fn event_stream_failed(source: bollard::errors::Error) -> Self {
        Self::EventStreamFailed {
            reason: source.to_string(),
            source,
        }
    }
}
