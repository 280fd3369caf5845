//! Autoload Registry
//!
//! Maps each specifier to its pending load actions and drives the per-entry
//! state machine `Unregistered → Loading → Loaded`.
//!
//! `trigger` distinguishes three situations:
//! - nothing registered: `Ok(false)`, the caller falls back to its normal
//!   lookup failure
//! - registered and loading: `Ok(false)`, so code inside the loading unit
//!   that touches the trigger symbol sees an ordinary miss
//! - registered and loaded: the unit did not define what it promised,
//!   reported as [`AutoloadError::UnmetAutoloadContract`]

use crate::error::AutoloadError;
use crate::notifier::{CompletionCallback, CompletionNotifier, UnitDescriptor};
use crate::orchestrator::{LoadAction, LoadOrchestrator};
use crate::specifier::Specifier;
use crate::symbols::SymbolTable;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a specifier's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Never triggered (or never registered)
    Unregistered,
    /// Actions are running
    Loading,
    /// All actions completed
    Loaded,
}

/// Everything registered for one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoloadEntry {
    pub specifier: Specifier,
    pub actions: Vec<LoadAction>,
    pub state: RegistrationState,
}

impl AutoloadEntry {
    fn new(specifier: Specifier) -> Self {
        Self {
            specifier,
            actions: Vec::new(),
            state: RegistrationState::Unregistered,
        }
    }
}

/// Registry of autoload entries.
///
/// Uses interior mutability so that `trigger` can be re-entered from inside a
/// loading unit. The entry lock is never held while actions or callbacks run.
pub struct AutoloadRegistry {
    entries: Mutex<HashMap<Specifier, AutoloadEntry>>,
    orchestrator: LoadOrchestrator,
    notifier: CompletionNotifier,
}

impl AutoloadRegistry {
    pub fn new(orchestrator: LoadOrchestrator) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            orchestrator,
            notifier: CompletionNotifier::new(),
        }
    }

    /// Append `action` to the entry for `specifier`, creating it if needed.
    pub fn register(&self, specifier: Specifier, action: LoadAction) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(specifier.clone())
            .or_insert_with(|| AutoloadEntry::new(specifier));

        if entry.state != RegistrationState::Unregistered {
            warn!(
                "Registering '{}' for `{}' after it was triggered; the action will not run",
                action.resource, entry.specifier
            );
        } else {
            debug!(
                "Registered `{}' -> '{}' (unit '{}', explicit: {})",
                entry.specifier, action.resource, action.owner_unit, action.explicit
            );
        }
        entry.actions.push(action);
    }

    /// Load whatever is registered for `specifier`.
    ///
    /// Returns `Ok(true)` when this call ran the load, `Ok(false)` when there
    /// is nothing to do. If an action fails the error propagates and the
    /// entry stays `Loading`.
    pub fn trigger(&self, specifier: &Specifier, symbols: &SymbolTable) -> Result<bool, AutoloadError> {
        let actions = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(specifier) else {
                return Ok(false);
            };
            match entry.state {
                RegistrationState::Loaded => {
                    return Err(AutoloadError::unmet_contract(specifier.clone()));
                }
                RegistrationState::Loading => {
                    debug!("`{}' referenced while loading, ignoring", specifier);
                    return Ok(false);
                }
                RegistrationState::Unregistered => {
                    entry.state = RegistrationState::Loading;
                    entry.actions.clone()
                }
            }
        };

        info!("Autoloading `{}' ({} action(s))", specifier, actions.len());
        for action in &actions {
            self.orchestrator.execute(action, symbols)?;
        }

        if let Some(entry) = self.entries.lock().get_mut(specifier) {
            entry.state = RegistrationState::Loaded;
        }

        let mut notified: Vec<&str> = Vec::new();
        for action in &actions {
            if !notified.contains(&action.owner_unit.as_str()) {
                notified.push(&action.owner_unit);
                self.notifier.notify(&action.owner_unit);
            }
        }

        Ok(true)
    }

    /// Subscribe to completion notifications; the last subscriber wins.
    pub fn on_complete(&self, callback: CompletionCallback) {
        self.notifier.on_complete(callback);
    }

    /// Make unit descriptors available to completion notifications.
    pub fn index_units<I>(&self, descriptors: I)
    where
        I: IntoIterator<Item = UnitDescriptor>,
    {
        self.notifier.index(descriptors);
    }

    pub fn state(&self, specifier: &Specifier) -> RegistrationState {
        self.entries
            .lock()
            .get(specifier)
            .map(|e| e.state)
            .unwrap_or(RegistrationState::Unregistered)
    }

    pub fn entry(&self, specifier: &Specifier) -> Option<AutoloadEntry> {
        self.entries.lock().get(specifier).cloned()
    }

    pub fn is_registered(&self, specifier: &Specifier) -> bool {
        self.entries.lock().contains_key(specifier)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn orchestrator(&self) -> &LoadOrchestrator {
        &self.orchestrator
    }

    pub fn notifier(&self) -> &CompletionNotifier {
        &self.notifier
    }
}

impl std::fmt::Debug for AutoloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoloadRegistry")
            .field("entries", &self.len())
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Shared handle used by installed interceptors.
pub type SharedRegistry = Arc<AutoloadRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ResourceCatalog;
    use serde_json::json;

    struct Fixture {
        symbols: SymbolTable,
        catalog: Arc<ResourceCatalog>,
        registry: AutoloadRegistry,
        log: Arc<Mutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(ResourceCatalog::new());
        let registry = AutoloadRegistry::new(LoadOrchestrator::new(catalog.clone()));
        Fixture {
            symbols: SymbolTable::new(),
            catalog,
            registry,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    impl Fixture {
        /// Provide a resource that records its run and defines `defines`.
        fn provide(&self, resource: &str, defines: &[&str]) {
            let log = Arc::clone(&self.log);
            let name = resource.to_string();
            let defines: Vec<Specifier> = defines.iter().map(|d| d.parse().unwrap()).collect();
            self.catalog.provide(resource, move |symbols| {
                log.lock().push(name.clone());
                for spec in &defines {
                    symbols.define(spec, json!(true));
                }
                Ok(())
            });
        }

        fn runs(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    fn spec(text: &str) -> Specifier {
        text.parse().unwrap()
    }

    #[test]
    fn test_trigger_unregistered_is_false() {
        let fx = fixture();
        assert!(!fx.registry.trigger(&spec("Nothing"), &fx.symbols).unwrap());
        assert!(fx.registry.is_empty());
        assert!(!fx.registry.is_registered(&spec("Nothing")));
        assert_eq!(
            fx.registry.state(&spec("Nothing")),
            RegistrationState::Unregistered
        );
    }

    #[test]
    fn test_trigger_runs_actions_in_order_once() {
        let fx = fixture();
        fx.provide("first", &["Foo"]);
        fx.provide("second", &[]);
        fx.registry
            .register(spec("Foo"), LoadAction::new("first", true, "a"));
        fx.registry
            .register(spec("Foo"), LoadAction::new("second", true, "a"));
        assert!(fx.registry.is_registered(&spec("Foo")));
        assert_eq!(fx.registry.state(&spec("Foo")), RegistrationState::Unregistered);

        assert!(fx.registry.trigger(&spec("Foo"), &fx.symbols).unwrap());
        assert_eq!(fx.runs(), vec!["first", "second"]);
        assert_eq!(fx.registry.state(&spec("Foo")), RegistrationState::Loaded);
    }

    #[test]
    fn test_second_trigger_is_unmet_contract() {
        let fx = fixture();
        fx.provide("lib", &[]);
        fx.registry
            .register(spec("Wrong"), LoadAction::new("lib", true, "lib"));

        assert!(fx.registry.trigger(&spec("Wrong"), &fx.symbols).unwrap());
        let err = fx.registry.trigger(&spec("Wrong"), &fx.symbols).unwrap_err();
        assert!(matches!(err, AutoloadError::UnmetAutoloadContract { .. }));
        assert_eq!(fx.runs(), vec!["lib"]);
    }

    #[test]
    fn test_reentrant_trigger_returns_false() {
        let fx = fixture();
        let registry = Arc::new(fx.registry);
        let inner = Arc::clone(&registry);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        fx.catalog.provide("lib", move |symbols| {
            *sink.lock() = Some(inner.trigger(&spec("Lib"), symbols).unwrap());
            symbols.define_constant("Lib", json!(1));
            Ok(())
        });
        registry.register(spec("Lib"), LoadAction::new("lib", true, "lib"));

        assert!(registry.trigger(&spec("Lib"), &fx.symbols).unwrap());
        assert_eq!(*seen.lock(), Some(false));
        assert_eq!(registry.state(&spec("Lib")), RegistrationState::Loaded);
    }

    #[test]
    fn test_explicit_missing_leaves_loading() {
        let fx = fixture();
        fx.registry
            .register(spec("Gone"), LoadAction::new("gone", true, "gone"));

        let err = fx.registry.trigger(&spec("Gone"), &fx.symbols).unwrap_err();
        assert!(matches!(err, AutoloadError::ResourceNotFound { .. }));
        assert_eq!(fx.registry.state(&spec("Gone")), RegistrationState::Loading);
        // Later triggers fall through
        assert!(!fx.registry.trigger(&spec("Gone"), &fx.symbols).unwrap());
    }

    #[test]
    fn test_implicit_missing_reaches_loaded() {
        let fx = fixture();
        fx.registry
            .register(spec("Gone"), LoadAction::new("gone", false, "gone"));

        assert!(fx.registry.trigger(&spec("Gone"), &fx.symbols).unwrap());
        assert_eq!(fx.registry.state(&spec("Gone")), RegistrationState::Loaded);
    }

    #[test]
    fn test_notifies_each_unit_once_in_order() {
        let fx = fixture();
        fx.provide("b1", &["Shared"]);
        fx.provide("b2", &[]);
        fx.provide("a1", &[]);
        fx.registry.index_units([UnitDescriptor::new("beta"), UnitDescriptor::new("alpha")]);
        fx.registry
            .register(spec("Shared"), LoadAction::new("b1", true, "beta"));
        fx.registry
            .register(spec("Shared"), LoadAction::new("a1", true, "alpha"));
        fx.registry
            .register(spec("Shared"), LoadAction::new("b2", true, "beta"));

        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        fx.registry.on_complete(Arc::new(move |d: &UnitDescriptor| {
            sink.lock().push(d.name.clone());
        }));

        assert!(fx.registry.trigger(&spec("Shared"), &fx.symbols).unwrap());
        assert_eq!(*notified.lock(), vec!["beta", "alpha"]);
        assert_eq!(fx.runs(), vec!["b1", "a1", "b2"]);
    }

    #[test]
    fn test_unit_is_notified_once_across_triggers() {
        let fx = fixture();
        fx.provide("x", &["Foo"]);
        fx.registry.index_units([UnitDescriptor::new("x")]);
        fx.registry.register(spec("Foo"), LoadAction::new("x", true, "x"));
        fx.registry.register(spec("Bar"), LoadAction::new("x", true, "x"));

        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        fx.registry.on_complete(Arc::new(move |d: &UnitDescriptor| {
            sink.lock().push(d.name.clone());
        }));

        assert!(fx.registry.trigger(&spec("Foo"), &fx.symbols).unwrap());
        // The resource already ran, so the second trigger loads nothing new
        assert!(fx.registry.trigger(&spec("Bar"), &fx.symbols).unwrap());
        assert_eq!(fx.runs(), vec!["x"]);
        assert_eq!(*notified.lock(), vec!["x"]);
    }

    #[test]
    fn test_failed_trigger_does_not_notify() {
        let fx = fixture();
        fx.registry.index_units([UnitDescriptor::new("gone")]);
        fx.registry
            .register(spec("Gone"), LoadAction::new("gone", true, "gone"));
        let notified = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&notified);
        fx.registry
            .on_complete(Arc::new(move |_: &UnitDescriptor| *sink.lock() += 1));

        assert!(fx.registry.trigger(&spec("Gone"), &fx.symbols).is_err());
        assert_eq!(*notified.lock(), 0);
    }

    #[test]
    fn test_register_after_trigger_keeps_state() {
        let fx = fixture();
        fx.provide("lib", &["Lib"]);
        fx.registry
            .register(spec("Lib"), LoadAction::new("lib", true, "lib"));
        fx.registry.trigger(&spec("Lib"), &fx.symbols).unwrap();

        fx.registry
            .register(spec("Lib"), LoadAction::new("late", true, "late"));
        let entry = fx.registry.entry(&spec("Lib")).unwrap();
        assert_eq!(entry.state, RegistrationState::Loaded);
        assert_eq!(entry.actions.len(), 2);
    }
}
