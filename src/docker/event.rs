use bollard::models::EventMessage;

/// A container lifecycle notification relevant to rule management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The container started; it still has to be inspected before rules can be derived.
    Start { id: String },
    Die { id: String },
}

impl LifecycleEvent {
    pub fn id(&self) -> &str {
        match self {
            LifecycleEvent::Start { id } | LifecycleEvent::Die { id } => id,
        }
    }

    /// Map a raw Docker event, ignoring actions other than `start` and `die`.
    pub fn from_message(event: &EventMessage) -> Option<Self> {
        let id = event.actor.as_ref()?.id.clone()?;
        match event.action.as_deref()? {
            "start" => Some(LifecycleEvent::Start { id }),
            "die" => Some(LifecycleEvent::Die { id }),
            _ => None,
        }
    }
}
