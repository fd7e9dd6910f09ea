// events/mod.rs
mod reactions;

pub use reactions::register_print_reactions;

use dashmap::DashMap;
use std::fmt;
use tracing::debug;

/// Printer host events. Anything the service does not react to is kept by
/// name in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    PrintStarted,
    PrintDone,
    Other(String),
}

impl From<&str> for HostEventKind {
    fn from(name: &str) -> Self {
        match name {
            "PrintStarted" => Self::PrintStarted,
            "PrintDone" => Self::PrintDone,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HostEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrintStarted => f.write_str("PrintStarted"),
            Self::PrintDone => f.write_str("PrintDone"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

type Callback = Box<dyn Fn(serde_json::Value) + Send + Sync>;

pub struct EventBus {
    subscribers: DashMap<HostEventKind, Vec<Callback>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Runs every callback registered for `kind`. Returns how many ran.
    pub fn publish(&self, kind: &HostEventKind, data: serde_json::Value) -> usize {
        let Some(subscribers) = self.subscribers.get(kind) else {
            debug!(event = %kind, "No subscribers for event");
            return 0;
        };
        for callback in subscribers.iter() {
            (callback)(data.clone());
        }
        subscribers.len()
    }

    pub fn subscribe<F: Fn(serde_json::Value) + Send + Sync + 'static>(
        &self,
        kind: HostEventKind,
        callback: F,
    ) {
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
