use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use ufw_docker_sync::docker::container::Container;
use ufw_docker_sync::docker::error::DockerError;
use ufw_docker_sync::docker::event::LifecycleEvent;
use ufw_docker_sync::docker::{Connect, ContainerRuntime};
use ufw_docker_sync::ufw::Firewall;
use ufw_docker_sync::ufw::error::UfwError;
use ufw_docker_sync::ufw::rule::Rule;
use ufw_docker_sync::{Error, Result};

/// In-memory Docker engine: running containers plus the latest event subscription.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, Container>>,
    subscription: Mutex<Option<mpsc::Sender<Result<LifecycleEvent>>>>,
    subscribe_count: AtomicUsize,
    list_count: AtomicUsize,
    fail_list: AtomicBool,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a container running without emitting an event.
    pub fn add_running(&self, container: Container) {
        self.containers
            .lock()
            .unwrap()
            .insert(container.id.clone(), container);
    }

    pub fn start_container(&self, container: Container) {
        let id = container.id.clone();
        self.add_running(container);
        self.emit(Ok(LifecycleEvent::Start { id }));
    }

    pub fn stop_container(&self, id: &str) {
        self.containers.lock().unwrap().remove(id);
        self.emit(Ok(LifecycleEvent::Die { id: id.to_string() }));
    }

    /// Emit a start event for a container the engine can't inspect.
    pub fn emit_phantom_start(&self, id: &str) {
        self.emit(Ok(LifecycleEvent::Start { id: id.to_string() }));
    }

    /// Break the current subscription the way a lost daemon connection does.
    pub fn fail_stream(&self) {
        self.emit(Err(DockerError::EventStreamClosed.into()));
        self.subscription.lock().unwrap().take();
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    fn emit(&self, event: Result<LifecycleEvent>) {
        if let Some(tx) = self.subscription.lock().unwrap().as_ref() {
            tx.try_send(event).expect("event subscription is full or closed");
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> mpsc::Receiver<Result<LifecycleEvent>> {
        let (tx, rx) = mpsc::channel(64);
        *self.subscription.lock().unwrap() = Some(tx);
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        rx
    }

    async fn inspect(&self, id: &str) -> Result<Container> {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::container_not_found(id))
    }

    async fn list_managed(&self) -> Result<Vec<Container>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DockerError::DaemonNotResponding {
                duration: Duration::from_secs(10),
            }
            .into());
        }

        let mut containers: Vec<Container> =
            self.containers.lock().unwrap().values().cloned().collect();
        containers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(containers)
    }
}

/// Hands out the same [`FakeRuntime`], optionally failing the next attempts.
pub struct FakeConnector {
    runtime: Arc<FakeRuntime>,
    failures_remaining: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
}

impl FakeConnector {
    pub fn new(runtime: Arc<FakeRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            failures_remaining: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next(&self, attempts: usize) {
        self.failures_remaining.store(attempts, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connect for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>> {
        self.attempts.lock().unwrap().push(Instant::now());

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DockerError::DaemonNotResponding {
                duration: Duration::from_secs(10),
            }
            .into());
        }

        Ok(self.runtime.clone())
    }
}

/// Records every rule operation; duplicate adds are skipped like ufw does.
#[derive(Default)]
pub struct FakeFirewall {
    installed: Mutex<Vec<Rule>>,
    add_calls: Mutex<Vec<Rule>>,
    remove_calls: Mutex<Vec<Rule>>,
    failing_ports: Mutex<HashSet<u16>>,
    failing_remove_ports: Mutex<HashSet<u16>>,
    fail_list: AtomicBool,
}

impl FakeFirewall {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn install(&self, rule: Rule) {
        self.installed.lock().unwrap().push(rule);
    }

    pub fn fail_port(&self, port: u16) {
        self.failing_ports.lock().unwrap().insert(port);
    }

    /// Refuse to remove rules on `port`; they stay installed.
    pub fn fail_remove_port(&self, port: u16) {
        self.failing_remove_ports.lock().unwrap().insert(port);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn installed(&self) -> Vec<Rule> {
        self.installed.lock().unwrap().clone()
    }

    pub fn add_calls(&self) -> Vec<Rule> {
        self.add_calls.lock().unwrap().clone()
    }

    pub fn remove_calls(&self) -> Vec<Rule> {
        self.remove_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Firewall for FakeFirewall {
    async fn add_rule(&self, rule: &Rule) -> Result<()> {
        self.add_calls.lock().unwrap().push(rule.clone());

        if rule
            .port
            .is_some_and(|port| self.failing_ports.lock().unwrap().contains(&port))
        {
            return Err(UfwError::CommandFailed {
                command: format!("ufw {}", rule),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "ERROR: Couldn't update rules".to_string(),
            }
            .into());
        }

        let mut installed = self.installed.lock().unwrap();
        if !installed.contains(rule) {
            installed.push(rule.clone());
        }
        Ok(())
    }

    async fn remove_rule(&self, rule: &Rule) -> Result<()> {
        self.remove_calls.lock().unwrap().push(rule.clone());

        if rule
            .port
            .is_some_and(|port| self.failing_remove_ports.lock().unwrap().contains(&port))
        {
            return Err(UfwError::CommandFailed {
                command: format!("ufw route delete {}", rule),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "ERROR: Couldn't update rules".to_string(),
            }
            .into());
        }

        self.installed.lock().unwrap().retain(|r| r != rule);
        Ok(())
    }

    async fn list_managed_rules(&self) -> Result<Vec<Rule>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(UfwError::CommandFailed {
                command: "ufw show added".to_string(),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "ERROR: You need to be root to run this script".to_string(),
            }
            .into());
        }
        Ok(self.installed())
    }
}
