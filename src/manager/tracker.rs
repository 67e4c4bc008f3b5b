use crate::ufw::rule::Rule;
use bon::Builder;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Record that a container's rules are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedContainer {
    /// Short container ID.
    pub id: String,
    pub name: String,
    /// Only the rules that were actually installed.
    pub rules: Vec<Rule>,
}

/// Shared map of short container ID to applied rule state.
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Debug, Clone, Default, Builder)]
pub struct Tracker {
    #[builder(default)]
    containers: Arc<Mutex<HashMap<String, TrackedContainer>>>,
}

impl Tracker {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TrackedContainer>> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the entry for `container.id`.
    pub fn insert(&self, container: TrackedContainer) {
        debug!(
            container_id = %container.id,
            container_name = %container.name,
            rules = container.rules.len(),
            "Tracking container"
        );
        self.lock().insert(container.id.clone(), container);
    }

    pub fn remove(&self, id: &str) -> Option<TrackedContainer> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            debug!(container_id = %id, "Stopped tracking container");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<TrackedContainer> {
        self.lock().get(id).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, TrackedContainer> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
