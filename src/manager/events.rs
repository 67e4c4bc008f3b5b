use crate::docker::ContainerRuntime;
use crate::docker::container::{Container, short_id};
use crate::docker::error::DockerError;
use crate::docker::event::LifecycleEvent;
use crate::{Error, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why the router stopped reading a subscription.
#[derive(Debug)]
pub enum RouteOutcome {
    /// The subscription failed or ended; a new connection is needed.
    StreamFailed(Error),
    Shutdown,
}

/// Forward lifecycle events to the workers until the subscription fails.
///
/// `start` events are inspected here, `die` events only carry the short ID.
/// Nothing in this loop touches the firewall.
pub async fn route_events(
    runtime: &dyn ContainerRuntime,
    mut events: mpsc::Receiver<Result<LifecycleEvent>>,
    create_tx: &mpsc::Sender<Container>,
    delete_tx: &mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> RouteOutcome {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return RouteOutcome::Shutdown,
            event = events.recv() => event,
        };

        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(e)) => return RouteOutcome::StreamFailed(e),
            None => return RouteOutcome::StreamFailed(DockerError::EventStreamClosed.into()),
        };
        debug!(container_id = %short_id(event.id()), "Received {:?}", event);

        let delivered = match event {
            LifecycleEvent::Start { id } => match runtime.inspect(&id).await {
                Ok(container) if !container.is_managed() => {
                    debug!(
                        container_id = %container.short_id(),
                        "Container is not managed, ignoring"
                    );
                    true
                }
                Ok(container) => {
                    info!(
                        container_id = %container.short_id(),
                        container_name = %container.name,
                        "Container started"
                    );
                    create_tx.send(container).await.is_ok()
                }
                Err(e) => {
                    // Reconciled later by a die event or the cleanup pass
                    warn!(container_id = %short_id(&id), "Couldn't inspect container: {}", e);
                    true
                }
            },
            LifecycleEvent::Die { id } => {
                info!(container_id = %short_id(&id), "Container died");
                delete_tx.send(short_id(&id).to_string()).await.is_ok()
            }
        };

        if !delivered {
            error!("Rule workers are gone, stopping event routing");
            return RouteOutcome::Shutdown;
        }
    }
}
