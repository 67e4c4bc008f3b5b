pub mod container;
pub mod error;
pub mod event;

use crate::docker::container::Container;
use crate::docker::error::DockerError;
use crate::docker::event::LifecycleEvent;
use crate::{Error, MANAGED_LABEL, MANAGED_LABEL_VALUE, Result};
use async_trait::async_trait;
use bollard::Docker;
use bon::{Builder, bon};
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};


/// Buffered events per subscription before the forwarder applies backpressure.
const EVENT_BUFFER: usize = 64;

/// Operations consumed from a live container runtime connection.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Lightweight liveness check.
    async fn ping(&self) -> Result<()>;

    /// Open a push stream of lifecycle events for managed containers.
    ///
    /// Any `Err` item is fatal to the subscription: nothing follows it and the
    /// caller is expected to reconnect.
    fn subscribe(&self) -> mpsc::Receiver<Result<LifecycleEvent>>;

    async fn inspect(&self, id: &str) -> Result<Container>;

    /// List running containers carrying the opt-in label.
    async fn list_managed(&self) -> Result<Vec<Container>>;
}

/// Opens new runtime connections.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionInfo {
    Socket(String),
    Http(String),
    Default,
}

impl ConnectionInfo {
    /// Interpret a `DOCKER_HOST` value.
    fn parse(docker_host: Option<&str>) -> Result<Self> {
        let Some(docker_host) = docker_host.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(ConnectionInfo::Default);
        };

        if let Some(path) = docker_host.strip_prefix("unix://") {
            Ok(ConnectionInfo::Socket(path.to_string()))
        } else if docker_host.starts_with('/') {
            Ok(ConnectionInfo::Socket(docker_host.to_string()))
        } else if let Some(addr) = docker_host.strip_prefix("tcp://") {
            Ok(ConnectionInfo::Http(format!("http://{}", addr)))
        } else if docker_host.starts_with("http://") {
            Ok(ConnectionInfo::Http(docker_host.to_string()))
        } else if docker_host.starts_with("https://") {
            Err(Error::config_with_suggestion(
                format!("TLS connections are not supported: {}", docker_host),
                "DOCKER_HOST",
                "Expose the daemon on a unix socket or a plain tcp:// endpoint",
            ))
        } else {
            Err(Error::config_with_suggestion(
                format!("Unsupported DOCKER_HOST scheme: {}", docker_host),
                "DOCKER_HOST",
                "Use unix:///path/to/docker.sock or tcp://host:port",
            ))
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            ConnectionInfo::Socket(path) => path,
            ConnectionInfo::Http(url) => url,
            ConnectionInfo::Default => "local default socket",
        }
    }
}

pub struct DockerClient {
    client: Docker,
    timeout_duration: Duration,
    connection_info: ConnectionInfo,
}

#[bon]
impl DockerClient {
    #[builder]
    pub fn new(
        #[builder(default = Duration::from_secs(30))] timeout_duration: Duration,
    ) -> Result<Self> {
        let docker_host = env::var("DOCKER_HOST").ok();
        let connection_info = ConnectionInfo::parse(docker_host.as_deref())?;
        let client = Self::create_client(&connection_info)?;

        Ok(Self {
            client,
            timeout_duration,
            connection_info,
        })
    }

    fn create_client(connection_info: &ConnectionInfo) -> Result<Docker> {
        let result = match connection_info {
            ConnectionInfo::Socket(socket_path) => {
                Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
            }
            ConnectionInfo::Http(url) => {
                Docker::connect_with_http(url, 120, bollard::API_DEFAULT_VERSION)
            }
            ConnectionInfo::Default => Docker::connect_with_socket_defaults(),
        };

        result.map_err(|e| DockerError::connection_failed(connection_info.endpoint(), e).into())
    }

    /// Negotiate the API version with the daemon, keeping the default version
    /// when negotiation fails or times out. Skipped when `DOCKER_API_VERSION` is set.
    pub async fn negotiate_version(self) -> Result<Self> {
        if let Ok(version) = env::var("DOCKER_API_VERSION") {
            info!("DOCKER_API_VERSION is set to {}, skipping negotiation", version);
            return Ok(self);
        }

        let timeout_duration = self.timeout_duration;
        let connection_info = self.connection_info.clone();

        let client = match timeout(timeout_duration, self.client.negotiate_version()).await {
            Ok(Ok(negotiated)) => {
                debug!("Negotiated Docker API version");
                negotiated
            }
            Ok(Err(e)) => {
                warn!(
                    "Failed to negotiate Docker API version: {}. Using default version.",
                    e
                );
                // negotiate_version consumed the client
                Self::create_client(&connection_info)?
            }
            Err(_) => {
                warn!("Docker API version negotiation timed out. Using default version.");
                Self::create_client(&connection_info)?
            }
        };

        Ok(Self {
            client,
            timeout_duration,
            connection_info,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn ping(&self) -> Result<()> {
        timeout(self.timeout_duration, self.client.ping())
            .await
            .map_err(|_| DockerError::DaemonNotResponding {
                duration: self.timeout_duration,
            })?
            .map_err(|e| DockerError::connection_failed(self.connection_info.endpoint(), e))?;
        Ok(())
    }

    fn subscribe(&self) -> mpsc::Receiver<Result<LifecycleEvent>> {
        use bollard::query_parameters::EventsOptionsBuilder;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let client = self.client.clone();

        tokio::spawn(async move {
            let label_filter = format!("{}={}", MANAGED_LABEL, MANAGED_LABEL_VALUE);
            let mut filters = HashMap::new();
            filters.insert("type", vec!["container"]);
            filters.insert("event", vec!["start", "die"]);
            filters.insert("label", vec![label_filter.as_str()]);

            let options = EventsOptionsBuilder::default().filters(&filters).build();
            let mut stream = std::pin::pin!(client.events(Some(options)));

            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("Event subscription dropped, stopping forwarder");
                        return;
                    }
                    next = stream.next() => {
                        let item: Result<LifecycleEvent> = match next {
                            Some(Ok(message)) => match LifecycleEvent::from_message(&message) {
                                Some(event) => Ok(event),
                                None => {
                                    debug!("Ignoring Docker event: {:?}", message.action);
                                    continue;
                                }
                            },
                            Some(Err(e)) => Err(DockerError::event_stream_failed(e).into()),
                            None => Err(DockerError::EventStreamClosed.into()),
                        };

                        let fatal = item.is_err();
                        if tx.send(item).await.is_err() || fatal {
                            return;
                        }
                    }
                }
            }
        });

        rx
    }

    async fn inspect(&self, id: &str) -> Result<Container> {
        use bollard::query_parameters::InspectContainerOptionsBuilder;

        let options = InspectContainerOptionsBuilder::default().build();

        let inspect = timeout(
            self.timeout_duration,
            self.client.inspect_container(id, Some(options)),
        )
        .await
        .map_err(|_| Error::timeout(self.timeout_duration, "inspect container"))?
        .map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => Error::container_not_found(id),
            e => Error::Docker(e),
        })?;

        Container::from_inspect(inspect)
    }

    async fn list_managed(&self) -> Result<Vec<Container>> {
        use bollard::query_parameters::ListContainersOptionsBuilder;

        let label_filter = format!("{}={}", MANAGED_LABEL, MANAGED_LABEL_VALUE);
        let mut filters = HashMap::new();
        filters.insert("label", vec![label_filter.as_str()]);
        filters.insert("status", vec!["running"]);

        let options = ListContainersOptionsBuilder::default()
            .all(false)
            .filters(&filters)
            .build();

        let summaries = timeout(
            self.timeout_duration,
            self.client.list_containers(Some(options)),
        )
        .await
        .map_err(|_| Error::timeout(self.timeout_duration, "list containers"))??;

        let mut containers = Vec::with_capacity(summaries.len());
        for id in summaries.into_iter().filter_map(|s| s.id) {
            match self.inspect(&id).await {
                Ok(container) => containers.push(container),
                // Stopped between listing and inspection
                Err(e) if e.is_not_found() => {
                    debug!(container_id = %id, "Container vanished during listing");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(containers)
    }
}

/// Connects to the Docker daemon configured by the environment.
#[derive(Debug, Clone, Builder)]
pub struct DockerConnector {
    #[builder(default = Duration::from_secs(10))]
    timeout: Duration,
}

#[async_trait]
impl Connect for DockerConnector {
    async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>> {
        let client = DockerClient::builder()
            .timeout_duration(self.timeout)
            .build()?
            .negotiate_version()
            .await?;
        Ok(Arc::new(client))
    }
}
