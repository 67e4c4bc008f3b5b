use crate::docker::container::Container;
use crate::manager::tracker::{TrackedContainer, Tracker};
use crate::ufw::Firewall;
use crate::ufw::derive::derive_rules;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Install every rule derived for `container` and record the ones that applied.
///
/// Returns the number of rules installed. Individual failures are logged and
/// do not stop the remaining rules from being applied.
pub async fn create_container_rules(
    firewall: &dyn Firewall,
    tracker: &Tracker,
    container: &Container,
) -> usize {
    let rules = derive_rules(container);
    let mut applied = Vec::with_capacity(rules.len());

    for rule in rules {
        match firewall.add_rule(&rule).await {
            Ok(()) => {
                info!(
                    container_id = %container.short_id(),
                    container_name = %container.name,
                    "Added rule: {}", rule
                );
                applied.push(rule);
            }
            Err(e) => {
                error!(
                    container_id = %container.short_id(),
                    container_name = %container.name,
                    "Failed to add rule {}: {}", rule, e
                );
            }
        }
    }

    let count = applied.len();
    tracker.insert(TrackedContainer {
        id: container.short_id().to_string(),
        name: container.name.clone(),
        rules: applied,
    });
    count
}

/// Apply containers in arrival order until the channel closes or shutdown is requested.
pub async fn run_create_worker(
    mut rx: mpsc::Receiver<Container>,
    firewall: Arc<dyn Firewall>,
    tracker: Tracker,
    cancel: CancellationToken,
) {
    loop {
        let container = tokio::select! {
            _ = cancel.cancelled() => break,
            container = rx.recv() => match container {
                Some(container) => container,
                None => break,
            },
        };

        create_container_rules(firewall.as_ref(), &tracker, &container).await;
    }

    debug!("Rule creation worker stopped");
}
