pub mod docker;
pub mod error;
pub mod manager;
pub mod ufw;

pub use error::{Error, Result};
pub use manager::{RuleManager, RunningManager};
use std::time::Duration;
use tokio::signal;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label a container must carry to have its firewall rules managed.
pub const MANAGED_LABEL: &str = "UFW_MANAGED";
pub const MANAGED_LABEL_VALUE: &str = "TRUE";
pub const ALLOW_FROM_LABEL: &str = "UFW_ALLOW_FROM";
pub const DENY_OUT_LABEL: &str = "UFW_DENY_OUT";
pub const ALLOW_TO_LABEL: &str = "UFW_ALLOW_TO";

pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();

    if let Some(stripped) = s.strip_suffix("ms") {
        stripped
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| format!("Invalid milliseconds: {}", e))
    } else if let Some(stripped) = s.strip_suffix('s') {
        stripped
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("Invalid seconds: {}", e))
    } else if let Some(stripped) = s.strip_suffix('m') {
        stripped
            .parse::<u64>()
            .map(|m| Duration::from_secs(m * 60))
            .map_err(|e| format!("Invalid minutes: {}", e))
    } else {
        // Default to seconds if no suffix
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("Invalid duration: {}", e))
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
