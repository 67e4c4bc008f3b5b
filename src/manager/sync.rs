use crate::docker::ContainerRuntime;
use crate::docker::container::Container;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Feed every running managed container into the creation path.
///
/// Tracked state is never diffed or pruned here; entries for containers that
/// are gone are left for the cleanup pass.
pub async fn sync_containers(
    runtime: &dyn ContainerRuntime,
    create_tx: &mpsc::Sender<Container>,
) -> Result<usize> {
    let containers = runtime.list_managed().await?;
    let count = containers.len();

    for container in containers {
        create_tx
            .send(container)
            .await
            .map_err(|_| Error::channel_closed("create"))?;
    }

    info!(containers = count, "Synced running containers");
    Ok(count)
}

/// Run [`sync_containers`] in the background.
pub fn spawn_sync(
    runtime: Arc<dyn ContainerRuntime>,
    create_tx: mpsc::Sender<Container>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = sync_containers(runtime.as_ref(), &create_tx) => {
                if let Err(e) = result {
                    error!("Container sync failed: {}", e);
                }
            }
        }
    });
}
