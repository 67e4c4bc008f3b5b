use bon::builder;
use std::time::Duration;

/// Initialize tracing for integration tests with maximum verbosity
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ufw_docker_sync=trace,integration_tests=trace")
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds, panicking after `timeout`.
#[builder]
pub async fn wait_until<F: Fn() -> bool>(
    condition: F,
    #[builder(default)] description: &str,
    #[builder(default = Duration::from_secs(5))] timeout: Duration,
    #[builder(default = Duration::from_millis(10))] poll_interval: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("Timed out after {:?} waiting for: {}", timeout, description);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
