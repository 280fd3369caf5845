//! Host Symbol Table
//!
//! The resolution mechanism the autoload engine layers itself over. Each
//! namespace holds members of the three [`MemberKind`]s. Resolution first
//! looks the member up natively and, on a miss, calls the missing-member
//! handler registered for `(namespace, kind)`; the default handler reports
//! [`AutoloadError::NameNotFound`].
//!
//! Handlers are plain values. Code that wants to extend miss handling reads
//! the current handler with [`SymbolTable::missing_handler`], wraps it, and
//! stores the wrapper with [`SymbolTable::set_missing_handler`].

use crate::error::AutoloadError;
use crate::specifier::{MemberKind, NamespacePath, Specifier};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Value bound to a symbol.
pub type Value = serde_json::Value;

/// Called when a member misses native lookup.
pub type MissingHandler =
    Arc<dyn Fn(&SymbolTable, &Specifier) -> Result<Value, AutoloadError> + Send + Sync>;

type HandlerKey = (NamespacePath, MemberKind);

/// Members defined in one namespace.
#[derive(Debug, Default)]
struct Members {
    constants: HashMap<String, Value>,
    instance: HashMap<String, Value>,
    namespace: HashMap<String, Value>,
}

impl Members {
    fn of_kind(&self, kind: MemberKind) -> &HashMap<String, Value> {
        match kind {
            MemberKind::Constant => &self.constants,
            MemberKind::InstanceMember => &self.instance,
            MemberKind::NamespaceMember => &self.namespace,
        }
    }

    fn of_kind_mut(&mut self, kind: MemberKind) -> &mut HashMap<String, Value> {
        match kind {
            MemberKind::Constant => &mut self.constants,
            MemberKind::InstanceMember => &mut self.instance,
            MemberKind::NamespaceMember => &mut self.namespace,
        }
    }
}

/// Process-wide table of namespaces and their members.
///
/// No lock is held while a missing-member handler runs, so handlers may
/// define and resolve symbols reentrantly.
#[derive(Default)]
pub struct SymbolTable {
    namespaces: RwLock<HashMap<NamespacePath, Members>>,
    handlers: RwLock<HashMap<HandlerKey, MissingHandler>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to the member named by `specifier`, returning the
    /// previous binding.
    pub fn define(&self, specifier: &Specifier, value: impl Into<Value>) -> Option<Value> {
        trace!("Defining {}", specifier);
        self.namespaces
            .write()
            .entry(specifier.namespace.clone())
            .or_default()
            .of_kind_mut(specifier.kind)
            .insert(specifier.member.clone(), value.into())
    }

    /// Bind a constant in the root namespace.
    pub fn define_constant(&self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.define(&Specifier::constant(name), value)
    }

    /// Native lookup. Never consults missing-member handlers.
    pub fn lookup(&self, specifier: &Specifier) -> Option<Value> {
        self.namespaces
            .read()
            .get(&specifier.namespace)
            .and_then(|members| members.of_kind(specifier.kind).get(&specifier.member))
            .cloned()
    }

    /// Whether the member is defined natively.
    pub fn is_defined(&self, specifier: &Specifier) -> bool {
        self.lookup(specifier).is_some()
    }

    /// Full resolution: native lookup, then the missing-member handler.
    pub fn resolve(&self, specifier: &Specifier) -> Result<Value, AutoloadError> {
        if let Some(value) = self.lookup(specifier) {
            return Ok(value);
        }
        let handler = self.missing_handler(&specifier.namespace, specifier.kind);
        handler(self, specifier)
    }

    /// Current missing-member handler for `(namespace, kind)`.
    pub fn missing_handler(&self, namespace: &NamespacePath, kind: MemberKind) -> MissingHandler {
        self.handlers
            .read()
            .get(&(namespace.clone(), kind))
            .cloned()
            .unwrap_or_else(not_found_handler)
    }

    /// Replace the missing-member handler for `(namespace, kind)`.
    pub fn set_missing_handler(
        &self,
        namespace: &NamespacePath,
        kind: MemberKind,
        handler: MissingHandler,
    ) {
        self.handlers.write().insert((namespace.clone(), kind), handler);
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("namespaces", &self.namespaces.read().len())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

/// The handler used when nothing has been installed.
pub fn not_found_handler() -> MissingHandler {
    Arc::new(|_: &SymbolTable, specifier: &Specifier| {
        Err(AutoloadError::name_not_found(specifier.clone()))
    })
}
