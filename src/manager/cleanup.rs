use crate::Result;
use crate::docker::ContainerRuntime;
use crate::manager::tracker::Tracker;
use crate::ufw::Firewall;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shortest period between scheduled cleanup passes.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one orphan cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub rules_removed: usize,
    pub rules_failed: usize,
    pub entries_dropped: usize,
}

/// Remove managed rules and tracked entries whose container is no longer running.
///
/// The tracker and the firewall are read before the live container list, so a
/// container that starts during the pass is either listed as live or has
/// nothing in either snapshot yet.
pub async fn cleanup_orphans(
    runtime: &dyn ContainerRuntime,
    firewall: &dyn Firewall,
    tracker: &Tracker,
) -> Result<CleanupReport> {
    let tracked = tracker.snapshot();
    let installed = firewall.list_managed_rules().await?;
    let live: HashSet<String> = runtime
        .list_managed()
        .await?
        .iter()
        .map(|c| c.short_id().to_string())
        .collect();

    let mut report = CleanupReport::default();

    for rule in installed.iter().filter(|r| !live.contains(&r.owner.id)) {
        match firewall.remove_rule(rule).await {
            Ok(()) => {
                info!(
                    container_id = %rule.owner.id,
                    container_name = %rule.owner.name,
                    "Removed orphaned rule: {}", rule
                );
                report.rules_removed += 1;
            }
            Err(e) => {
                error!(
                    container_id = %rule.owner.id,
                    "Failed to remove orphaned rule {}: {}", rule, e
                );
                report.rules_failed += 1;
            }
        }
    }

    for id in tracked.keys().filter(|id| !live.contains(*id)) {
        if tracker.remove(id).is_some() {
            debug!(container_id = %id, "Dropped tracked entry for stopped container");
            report.entries_dropped += 1;
        }
    }

    Ok(report)
}

/// Run cleanup once a connection is available, then on every tick or trigger.
pub async fn run_cleanup_loop(
    mut runtime_rx: watch::Receiver<Option<Arc<dyn ContainerRuntime>>>,
    firewall: Arc<dyn Firewall>,
    tracker: Tracker,
    cleanup_interval: Duration,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
) {
    let closed = tokio::select! {
        _ = cancel.cancelled() => true,
        result = runtime_rx.wait_for(Option::is_some) => result.is_err(),
    };
    if closed {
        return;
    }

    let mut ticker = interval(cleanup_interval.max(MIN_CLEANUP_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = trigger.notified() => debug!("Cleanup requested"),
        }

        let runtime = runtime_rx.borrow().clone();
        let Some(runtime) = runtime else {
            debug!("No Docker connection, skipping cleanup");
            continue;
        };

        match cleanup_orphans(runtime.as_ref(), firewall.as_ref(), &tracker).await {
            Ok(report) if report == CleanupReport::default() => debug!("No orphaned rules found"),
            Ok(report) => info!(
                removed = report.rules_removed,
                failed = report.rules_failed,
                dropped = report.entries_dropped,
                "Orphan cleanup finished"
            ),
            Err(e) => warn!("Orphan cleanup aborted: {}", e),
        }
    }

    debug!("Cleanup loop stopped");
}

/// Remove every managed rule from the firewall, returning how many were removed.
pub async fn clear_managed_rules(firewall: &dyn Firewall) -> Result<usize> {
    let rules = firewall.list_managed_rules().await?;
    let mut removed = 0;

    for rule in &rules {
        match firewall.remove_rule(rule).await {
            Ok(()) => removed += 1,
            Err(e) => error!("Failed to remove rule {}: {}", rule, e),
        }
    }

    info!(removed, total = rules.len(), "Cleared managed rules");
    Ok(removed)
}
