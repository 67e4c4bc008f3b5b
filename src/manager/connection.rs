use crate::Result;
use crate::docker::{Connect, ContainerRuntime};
use bon::bon;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Obtains validated runtime connections, retrying at a fixed interval.
pub struct ConnectionManager {
    connector: Arc<dyn Connect>,
    retry_delay: Duration,
    cancel: CancellationToken,
}

#[bon]
impl ConnectionManager {
    #[builder]
    pub fn new(
        connector: Arc<dyn Connect>,
        #[builder(default = DEFAULT_RETRY_DELAY)] retry_delay: Duration,
        #[builder(default)] cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            retry_delay,
            cancel,
        }
    }
}

impl ConnectionManager {
    /// Open a connection and make sure the daemon answers.
    pub async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>> {
        let runtime = self.connector.connect().await?;
        runtime.ping().await?;
        Ok(runtime)
    }

    /// Connect once, falling back to [`reconnect`](Self::reconnect) on failure.
    ///
    /// Returns `None` only on shutdown.
    pub async fn establish(&self) -> Option<Arc<dyn ContainerRuntime>> {
        let result = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            result = self.connect() => result,
        };

        match result {
            Ok(runtime) => {
                info!("Connected to the Docker engine");
                Some(runtime)
            }
            Err(e) => {
                error!("Failed to connect to the Docker engine: {}", e);
                self.reconnect().await
            }
        }
    }

    /// Retry forever, waiting `retry_delay` before every attempt.
    ///
    /// Returns `None` only on shutdown.
    pub async fn reconnect(&self) -> Option<Arc<dyn ContainerRuntime>> {
        let mut attempt: u64 = 0;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = sleep(self.retry_delay) => {}
            }

            attempt += 1;
            info!(attempt, "Trying to reconnect");

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                result = self.connect() => result,
            };

            match result {
                Ok(runtime) => {
                    info!(attempt, "Reconnected to the Docker engine");
                    return Some(runtime);
                }
                Err(e) => warn!(attempt, "Reconnect failed: {}", e),
            }
        }
    }
}
