//! Interception Installer
//!
//! Wraps the symbol table's missing-member handler for a `(namespace, kind)`
//! pair so that a miss first asks the registry to trigger a load. The handler
//! that was in place before is captured and becomes the fallback, so
//! interceptors installed by different parties stack instead of replacing
//! each other.

use crate::error::AutoloadError;
use crate::registry::SharedRegistry;
use crate::specifier::{MemberKind, NamespacePath, Specifier};
use crate::symbols::{MissingHandler, SymbolTable};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Installs autoload interceptors, at most one per `(namespace, kind)`.
pub struct InterceptorInstaller {
    registry: SharedRegistry,
    installed: Mutex<HashSet<(NamespacePath, MemberKind)>>,
}

impl InterceptorInstaller {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            installed: Mutex::new(HashSet::new()),
        }
    }

    /// Make `specifier` interceptable.
    ///
    /// Fails with [`AutoloadError::RegistrationConflict`] if the member is
    /// already defined, in which case nothing is installed. Returns `false`
    /// when an interceptor already covers the specifier's namespace and kind.
    pub fn install(&self, symbols: &SymbolTable, specifier: &Specifier) -> Result<bool, AutoloadError> {
        check_conflict(symbols, specifier)?;

        let key = (specifier.namespace.clone(), specifier.kind);
        if !self.installed.lock().insert(key) {
            return Ok(false);
        }

        let previous = symbols.missing_handler(&specifier.namespace, specifier.kind);
        let handler = intercepting_handler(Arc::clone(&self.registry), previous);
        symbols.set_missing_handler(&specifier.namespace, specifier.kind, handler);

        debug!(
            "Installed autoload interceptor for {} members of {}",
            specifier.kind, specifier.namespace
        );
        Ok(true)
    }

    pub fn is_installed(&self, namespace: &NamespacePath, kind: MemberKind) -> bool {
        self.installed.lock().contains(&(namespace.clone(), kind))
    }
}

impl std::fmt::Debug for InterceptorInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorInstaller")
            .field("installed", &self.installed.lock().len())
            .finish()
    }
}

/// Fail if `specifier` already resolves natively.
pub fn check_conflict(symbols: &SymbolTable, specifier: &Specifier) -> Result<(), AutoloadError> {
    if symbols.is_defined(specifier) {
        return Err(AutoloadError::conflict(specifier.clone()));
    }
    Ok(())
}

/// The interceptor: trigger, then retry once or fall back to `previous`.
///
/// The retry goes through full resolution, so a unit that loaded without
/// defining the member lands back here and the registry reports the unmet
/// contract.
fn intercepting_handler(registry: SharedRegistry, previous: MissingHandler) -> MissingHandler {
    Arc::new(move |symbols: &SymbolTable, specifier: &Specifier| {
        if registry.trigger(specifier, symbols)? {
            symbols.resolve(specifier)
        } else {
            previous(symbols, specifier)
        }
    })
}
