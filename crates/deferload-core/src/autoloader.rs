//! Autoloader
//!
//! Context object tying the symbol table, the registry and the interceptor
//! installer together. Tests and embedders construct their own instances;
//! a program that wants one shared instance initialises it once with
//! [`Autoloader::init_global`].

use crate::error::AutoloadError;
use crate::interceptor::{check_conflict, InterceptorInstaller};
use crate::notifier::UnitDescriptor;
use crate::orchestrator::{LoadAction, LoadOrchestrator, ResourceLoader};
use crate::registry::{AutoloadRegistry, SharedRegistry};
use crate::specifier::{parse_specifier, Specifier};
use crate::symbols::{SymbolTable, Value};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

static GLOBAL: OnceCell<Autoloader> = OnceCell::new();

/// Deferred loading engine for one symbol table.
pub struct Autoloader {
    symbols: Arc<SymbolTable>,
    registry: SharedRegistry,
    installer: InterceptorInstaller,
}

impl Autoloader {
    /// Create an autoloader over `symbols` that loads resources through `loader`.
    pub fn new(symbols: Arc<SymbolTable>, loader: Arc<dyn ResourceLoader>) -> Self {
        let registry = Arc::new(AutoloadRegistry::new(LoadOrchestrator::new(loader)));
        let installer = InterceptorInstaller::new(Arc::clone(&registry));
        Self {
            symbols,
            registry,
            installer,
        }
    }

    /// Install `autoloader` as the process-wide instance.
    ///
    /// Can succeed only once per process.
    pub fn init_global(autoloader: Autoloader) -> Result<&'static Autoloader, AutoloadError> {
        let global = GLOBAL
            .try_insert(autoloader)
            .map_err(|_| AutoloadError::AlreadyInitialized)?;
        info!("Process-wide autoloader initialised");
        Ok(global)
    }

    /// The process-wide instance, if initialised.
    pub fn global() -> Option<&'static Autoloader> {
        GLOBAL.get()
    }

    /// Register `resource` of `owner_unit` against every specifier.
    ///
    /// All specifiers are parsed and checked for conflicts before anything
    /// is registered, so a failure leaves the autoloader unchanged.
    pub fn register_autoload<S: AsRef<str>>(
        &self,
        specifiers: &[S],
        resource: &str,
        explicit: bool,
        owner_unit: &str,
    ) -> Result<(), AutoloadError> {
        let parsed = specifiers
            .iter()
            .map(|s| parse_specifier(s.as_ref()))
            .collect::<Result<Vec<Specifier>, _>>()?;

        for specifier in &parsed {
            check_conflict(&self.symbols, specifier)?;
        }

        for specifier in parsed {
            self.installer.install(&self.symbols, &specifier)?;
            self.registry
                .register(specifier, LoadAction::new(resource, explicit, owner_unit));
        }
        Ok(())
    }

    /// Trigger the load registered for a specifier string.
    pub fn trigger(&self, specifier: &str) -> Result<bool, AutoloadError> {
        let specifier = parse_specifier(specifier)?;
        self.registry.trigger(&specifier, &self.symbols)
    }

    /// Access a symbol the way program code would.
    pub fn resolve(&self, specifier: &str) -> Result<Value, AutoloadError> {
        let specifier = parse_specifier(specifier)?;
        self.symbols.resolve(&specifier)
    }

    /// Load a resource eagerly, bypassing the registry.
    pub fn require(&self, resource: &str, explicit: bool) -> Result<(), AutoloadError> {
        self.registry
            .orchestrator()
            .require(resource, explicit, &self.symbols)
    }

    /// Subscribe to units finishing an autoload; the last subscriber wins.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: Fn(&UnitDescriptor) + Send + Sync + 'static,
    {
        self.registry.on_complete(Arc::new(callback));
    }

    /// Make unit descriptors available to completion callbacks.
    pub fn index_units<I>(&self, descriptors: I)
    where
        I: IntoIterator<Item = UnitDescriptor>,
    {
        self.registry.index_units(descriptors);
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn registry(&self) -> &AutoloadRegistry {
        &self.registry
    }

    pub fn installer(&self) -> &InterceptorInstaller {
        &self.installer
    }
}

impl std::fmt::Debug for Autoloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autoloader")
            .field("symbols", &self.symbols)
            .field("registry", &self.registry)
            .field("installer", &self.installer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ResourceCatalog;
    use crate::registry::RegistrationState;
    use serde_json::json;

    fn autoloader() -> (Autoloader, Arc<ResourceCatalog>) {
        let catalog = Arc::new(ResourceCatalog::new());
        let loader = Autoloader::new(Arc::new(SymbolTable::new()), catalog.clone());
        (loader, catalog)
    }

    #[test]
    fn test_register_is_all_or_nothing() {
        let (loader, _) = autoloader();
        loader.symbols().define_constant("Taken", json!(1));

        let err = loader
            .register_autoload(&["Free", "Taken"], "lib", false, "lib")
            .unwrap_err();
        assert!(matches!(err, AutoloadError::RegistrationConflict { .. }));
        assert!(loader.registry().is_empty());
        assert!(!loader
            .installer()
            .is_installed(&crate::NamespacePath::root(), crate::MemberKind::Constant));
    }

    #[test]
    fn test_invalid_specifier_registers_nothing() {
        let (loader, _) = autoloader();
        let err = loader
            .register_autoload(&["Good", "Bad::"], "lib", false, "lib")
            .unwrap_err();
        assert!(matches!(err, AutoloadError::InvalidSpecifier(_)));
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_trigger_by_string() {
        let (loader, catalog) = autoloader();
        catalog.provide("lib", |symbols| {
            symbols.define_constant("Lib", json!("lib"));
            Ok(())
        });
        loader.register_autoload(&["Lib"], "lib", false, "lib").unwrap();

        assert!(!loader.trigger("Other").unwrap());
        assert!(loader.trigger("Lib").unwrap());
        assert_eq!(
            loader.registry().state(&"Object::Lib".parse().unwrap()),
            RegistrationState::Loaded
        );
        assert_eq!(loader.resolve("Lib").unwrap(), json!("lib"));
    }

    #[test]
    fn test_require_is_eager() {
        let (loader, catalog) = autoloader();
        catalog.provide("eager", |symbols| {
            symbols.define_constant("Eager", json!(true));
            Ok(())
        });

        loader.require("eager", true).unwrap();
        assert!(loader.symbols().is_defined(&"Eager".parse().unwrap()));
        assert!(loader.require("missing", false).is_ok());
        assert!(loader.require("missing", true).is_err());
    }

    #[test]
    fn test_global_initialises_once() {
        let (first, _) = autoloader();
        let (second, _) = autoloader();

        // Only this test touches the process-wide instance
        let global = Autoloader::init_global(first).unwrap();
        assert!(std::ptr::eq(global, Autoloader::global().unwrap()));
        assert!(matches!(
            Autoloader::init_global(second),
            Err(AutoloadError::AlreadyInitialized)
        ));
    }
}
