//! Completion Notifier
//!
//! Hands the descriptor of a unit that finished loading through a trigger to
//! the single process-wide subscriber. Each unit is reported at most once,
//! however many of its triggers fire.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What the declaration adapter knows about a declared unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Resource paths loaded for the unit
    #[serde(default)]
    pub resources: Vec<String>,
    /// Trigger specifiers the unit was registered under
    #[serde(default)]
    pub autoload: Vec<String>,
}

impl UnitDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            resources: Vec::new(),
            autoload: Vec::new(),
        }
    }
}

/// Callback receiving the descriptor of each unit loaded by a trigger.
pub type CompletionCallback = Arc<dyn Fn(&UnitDescriptor) + Send + Sync>;

/// Stores the subscriber and the unit-name → descriptor index.
#[derive(Default)]
pub struct CompletionNotifier {
    callback: RwLock<Option<CompletionCallback>>,
    descriptors: RwLock<HashMap<String, UnitDescriptor>>,
    notified: Mutex<HashSet<String>>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe; replaces any previous subscriber.
    pub fn on_complete(&self, callback: CompletionCallback) {
        if self.callback.write().replace(callback).is_some() {
            debug!("Replacing autoload completion callback");
        }
    }

    /// Add descriptors to the index, replacing entries with the same name.
    pub fn index<I>(&self, descriptors: I)
    where
        I: IntoIterator<Item = UnitDescriptor>,
    {
        let mut index = self.descriptors.write();
        for descriptor in descriptors {
            index.insert(descriptor.name.clone(), descriptor);
        }
    }

    pub fn descriptor(&self, unit: &str) -> Option<UnitDescriptor> {
        self.descriptors.read().get(unit).cloned()
    }

    /// Invoke the subscriber for `unit`.
    ///
    /// No subscriber is a no-op. A unit missing from the index is logged and
    /// skipped. A unit that was already reported is skipped.
    pub fn notify(&self, unit: &str) {
        let Some(callback) = self.callback.read().clone() else {
            return;
        };
        let Some(descriptor) = self.descriptor(unit) else {
            warn!("No descriptor for autoloaded unit '{}', not notifying", unit);
            return;
        };
        if !self.notified.lock().insert(unit.to_string()) {
            trace!("Unit '{}' already reported", unit);
            return;
        }
        debug!("Unit '{}' finished autoloading", unit);
        callback(&descriptor);
    }

    /// Whether `unit` has been reported to a subscriber.
    pub fn was_notified(&self, unit: &str) -> bool {
        self.notified.lock().contains(unit)
    }
}

impl std::fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionNotifier")
            .field("subscribed", &self.callback.read().is_some())
            .field("descriptors", &self.descriptors.read().len())
            .finish()
    }
}
