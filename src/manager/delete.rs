use crate::docker::container::short_id;
use crate::manager::tracker::Tracker;
use crate::ufw::Firewall;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Remove the rules of a tracked container.
///
/// Returns `false` without touching the firewall when `id` is not tracked.
/// The entry is dropped even if some removals fail.
pub async fn delete_container_rules(
    firewall: &dyn Firewall,
    tracker: &Tracker,
    id: &str,
) -> bool {
    let id = short_id(id);
    let Some(tracked) = tracker.remove(id) else {
        debug!(container_id = %id, "Container not tracked, nothing to delete");
        return false;
    };

    for rule in &tracked.rules {
        match firewall.remove_rule(rule).await {
            Ok(()) => info!(
                container_id = %tracked.id,
                container_name = %tracked.name,
                "Removed rule: {}", rule
            ),
            Err(e) => error!(
                container_id = %tracked.id,
                container_name = %tracked.name,
                "Failed to remove rule {}: {}", rule, e
            ),
        }
    }

    true
}

/// Delete containers in arrival order until the channel closes or shutdown is requested.
pub async fn run_delete_worker(
    mut rx: mpsc::Receiver<String>,
    firewall: Arc<dyn Firewall>,
    tracker: Tracker,
    cancel: CancellationToken,
) {
    loop {
        let id = tokio::select! {
            _ = cancel.cancelled() => break,
            id = rx.recv() => match id {
                Some(id) => id,
                None => break,
            },
        };

        delete_container_rules(firewall.as_ref(), &tracker, &id).await;
    }

    debug!("Rule deletion worker stopped");
}
