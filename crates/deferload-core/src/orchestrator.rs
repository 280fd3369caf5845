//! Load Orchestrator
//!
//! Runs the load actions of a triggered specifier against a
//! [`ResourceLoader`], applying explicit-vs-implicit failure semantics:
//! an implicit action (resource path guessed from the unit name) that cannot
//! find its resource is skipped; every other failure propagates.

use crate::error::AutoloadError;
use crate::symbols::SymbolTable;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// One concrete resource load for a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAction {
    /// Resource path handed to the loader
    pub resource: String,
    /// Whether a missing resource is an error
    pub explicit: bool,
    /// Unit this action belongs to
    pub owner_unit: String,
}

impl LoadAction {
    pub fn new(resource: impl Into<String>, explicit: bool, owner_unit: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            explicit,
            owner_unit: owner_unit.into(),
        }
    }
}

/// Something that can load a resource into the symbol table.
pub trait ResourceLoader: Send + Sync {
    /// Load `resource`.
    ///
    /// Returns `Ok(false)` when the resource had already been loaded and
    /// nothing ran. A resource that does not exist must be reported as
    /// [`AutoloadError::ResourceNotFound`] naming that resource.
    fn load(&self, resource: &str, symbols: &SymbolTable) -> Result<bool, AutoloadError>;
}

/// Code run when a resource loads.
pub type ResourceBody = Arc<dyn Fn(&SymbolTable) -> Result<(), AutoloadError> + Send + Sync>;

/// In-memory resource loader with require-once semantics.
///
/// A resource is marked loaded before its body runs, so a body that requires
/// itself does not recurse. If the body fails the mark is removed again.
#[derive(Default)]
pub struct ResourceCatalog {
    bodies: RwLock<HashMap<String, ResourceBody>>,
    loaded: Mutex<HashSet<String>>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `resource` available for loading.
    pub fn provide<F>(&self, resource: impl Into<String>, body: F)
    where
        F: Fn(&SymbolTable) -> Result<(), AutoloadError> + Send + Sync + 'static,
    {
        self.bodies.write().insert(resource.into(), Arc::new(body));
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.bodies.read().contains_key(resource)
    }

    /// Whether `resource` has been loaded successfully (or is loading).
    pub fn is_loaded(&self, resource: &str) -> bool {
        self.loaded.lock().contains(resource)
    }
}

impl ResourceLoader for ResourceCatalog {
    fn load(&self, resource: &str, symbols: &SymbolTable) -> Result<bool, AutoloadError> {
        if self.is_loaded(resource) {
            trace!("Resource '{}' already loaded", resource);
            return Ok(false);
        }

        let body = self
            .bodies
            .read()
            .get(resource)
            .cloned()
            .ok_or_else(|| AutoloadError::resource_not_found(resource))?;

        self.loaded.lock().insert(resource.to_string());
        debug!("Loading resource '{}'", resource);
        if let Err(e) = body(symbols) {
            self.loaded.lock().remove(resource);
            return Err(e);
        }
        Ok(true)
    }
}

/// Executes load actions through a [`ResourceLoader`].
#[derive(Clone)]
pub struct LoadOrchestrator {
    loader: Arc<dyn ResourceLoader>,
}

impl LoadOrchestrator {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self { loader }
    }

    /// Run one load action.
    pub fn execute(&self, action: &LoadAction, symbols: &SymbolTable) -> Result<(), AutoloadError> {
        self.require(&action.resource, action.explicit, symbols)
    }

    /// Load a resource, swallowing its own absence unless `explicit`.
    ///
    /// A missing resource reported from *inside* the resource (a nested
    /// load) is a load-time failure of this resource and always propagates.
    pub fn require(
        &self,
        resource: &str,
        explicit: bool,
        symbols: &SymbolTable,
    ) -> Result<(), AutoloadError> {
        match self.loader.load(resource, symbols) {
            Ok(_) => Ok(()),
            Err(AutoloadError::ResourceNotFound { resource: missing })
                if !explicit && missing == resource =>
            {
                debug!("Skipping implicit resource '{}': not found", resource);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for LoadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOrchestrator").finish_non_exhaustive()
    }
}
