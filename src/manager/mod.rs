pub mod cleanup;
pub mod connection;
pub mod create;
pub mod delete;
pub mod events;
pub mod sync;
pub mod tracker;


use crate::docker::container::Container;
use crate::docker::{Connect, ContainerRuntime};
use crate::manager::connection::{ConnectionManager, DEFAULT_RETRY_DELAY};
use crate::manager::events::RouteOutcome;
use crate::manager::tracker::Tracker;
use crate::ufw::Firewall;
use bon::bon;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

type RuntimeSlot = Option<Arc<dyn ContainerRuntime>>;

/// Keeps the firewall in line with the managed containers of a Docker engine.
pub struct RuleManager {
    connector: Arc<dyn Connect>,
    firewall: Arc<dyn Firewall>,
    retry_delay: Duration,
    cleanup_interval: Duration,
    channel_capacity: usize,
    tracker: Tracker,
}

#[bon]
impl RuleManager {
    #[builder]
    pub fn new(
        connector: Arc<dyn Connect>,
        firewall: Arc<dyn Firewall>,
        #[builder(default = DEFAULT_RETRY_DELAY)] retry_delay: Duration,
        #[builder(default = DEFAULT_CLEANUP_INTERVAL)] cleanup_interval: Duration,
        #[builder(default = DEFAULT_CHANNEL_CAPACITY)] channel_capacity: usize,
    ) -> Self {
        Self {
            connector,
            firewall,
            retry_delay,
            cleanup_interval: cleanup_interval.max(cleanup::MIN_CLEANUP_INTERVAL),
            channel_capacity: channel_capacity.max(1),
            tracker: Tracker::default(),
        }
    }
}

impl RuleManager {
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Spawn the workers, the cleanup loop and the connection supervisor.
    pub fn start(self) -> RunningManager {
        let cancel = CancellationToken::new();
        let cleanup_trigger = Arc::new(Notify::new());
        let (create_tx, create_rx) = mpsc::channel::<Container>(self.channel_capacity);
        let (delete_tx, delete_rx) = mpsc::channel::<String>(self.channel_capacity);
        let (runtime_tx, runtime_rx) = watch::channel::<RuntimeSlot>(None);

        let connection = ConnectionManager::builder()
            .connector(self.connector)
            .retry_delay(self.retry_delay)
            .cancel(cancel.clone())
            .build();

        // Creation and deletion run as independent workers, so a start and a die
        // for the same container may reach the tracker in either order. Both
        // operations are idempotent and the cleanup pass removes whatever is
        // left behind for a dead container.
        let tasks = vec![
            tokio::spawn(create::run_create_worker(
                create_rx,
                Arc::clone(&self.firewall),
                self.tracker.clone(),
                cancel.clone(),
            )),
            tokio::spawn(delete::run_delete_worker(
                delete_rx,
                Arc::clone(&self.firewall),
                self.tracker.clone(),
                cancel.clone(),
            )),
            tokio::spawn(cleanup::run_cleanup_loop(
                runtime_rx,
                Arc::clone(&self.firewall),
                self.tracker.clone(),
                self.cleanup_interval,
                Arc::clone(&cleanup_trigger),
                cancel.clone(),
            )),
            tokio::spawn(supervise(
                connection,
                runtime_tx,
                create_tx,
                delete_tx,
                cancel.clone(),
            )),
        ];

        info!("Rule manager started");
        RunningManager {
            cancel,
            cleanup_trigger,
            tracker: self.tracker,
            tasks,
        }
    }
}

/// Handle to a started [`RuleManager`].
pub struct RunningManager {
    cancel: CancellationToken,
    cleanup_trigger: Arc<Notify>,
    tracker: Tracker,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningManager {
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Run an orphan cleanup pass now instead of waiting for the next tick.
    pub fn trigger_cleanup(&self) {
        self.cleanup_trigger.notify_one();
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Rule manager task failed: {}", e);
            }
        }
        info!("Rule manager stopped");
    }
}

/// Connection supervisor: subscribe, sync, route, and start over after a stream failure.
async fn supervise(
    connection: ConnectionManager,
    runtime_tx: watch::Sender<RuntimeSlot>,
    create_tx: mpsc::Sender<Container>,
    delete_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    let Some(mut runtime) = connection.establish().await else {
        return;
    };

    loop {
        runtime_tx.send_replace(Some(Arc::clone(&runtime)));

        // Subscribe before listing so a container starting in between is not missed
        let events = runtime.subscribe();
        sync::spawn_sync(Arc::clone(&runtime), create_tx.clone(), cancel.clone());

        let outcome =
            events::route_events(runtime.as_ref(), events, &create_tx, &delete_tx, &cancel).await;
        runtime_tx.send_replace(None);

        match outcome {
            RouteOutcome::Shutdown => return,
            RouteOutcome::StreamFailed(e) => error!("Docker event stream failed: {}", e),
        }

        runtime = match connection.reconnect().await {
            Some(runtime) => runtime,
            None => return,
        };
    }
}
