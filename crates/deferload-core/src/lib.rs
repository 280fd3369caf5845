//! Deferload Core - Deferred, symbol-triggered loading of program units
//!
//! A declared unit can be registered against one or more symbols instead of
//! being loaded at startup. The first access to any of those symbols loads
//! the unit's resources and then completes the access as if the unit had
//! been loaded all along.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐      ┌──────────────────────┐
//! │ DeclarationAdapter│─────►│      Autoloader      │
//! └───────────────────┘      └──────────┬───────────┘
//!                                       │
//!            ┌──────────────────────────┼───────────────────────┐
//!            ▼                          ▼                       ▼
//! ┌─────────────────────┐   ┌──────────────────────┐   ┌─────────────────┐
//! │InterceptorInstaller │   │   AutoloadRegistry   │   │   SymbolTable   │
//! │ wraps miss handlers │──►│ Unregistered/Loading │◄──│ lookup, resolve │
//! └─────────────────────┘   │       /Loaded        │   └─────────────────┘
//!                           └──────────┬───────────┘
//!                         ┌────────────┴────────────┐
//!                         ▼                         ▼
//!               ┌──────────────────┐     ┌────────────────────┐
//!               │ LoadOrchestrator │     │ CompletionNotifier │
//!               │  ResourceLoader  │     │  UnitDescriptor    │
//!               └──────────────────┘     └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deferload_core::{Autoloader, ResourceCatalog, SymbolTable};
//! use serde_json::json;
//!
//! let catalog = Arc::new(ResourceCatalog::new());
//! catalog.provide("slow_lib", |symbols| {
//!     symbols.define_constant("SlowLib", json!("loaded"));
//!     Ok(())
//! });
//!
//! let autoloader = Autoloader::new(Arc::new(SymbolTable::new()), catalog.clone());
//! autoloader
//!     .register_autoload(&["SlowLib"], "slow_lib", false, "slow_lib")
//!     .unwrap();
//! assert!(!catalog.is_loaded("slow_lib"));
//!
//! assert_eq!(autoloader.resolve("SlowLib").unwrap(), json!("loaded"));
//! assert!(catalog.is_loaded("slow_lib"));
//! ```

pub mod autoloader;
pub mod declaration;
pub mod error;
pub mod interceptor;
pub mod notifier;
pub mod orchestrator;
pub mod registry;
pub mod specifier;
pub mod symbols;

pub use autoloader::Autoloader;
pub use declaration::{
    infer_namespace, ApplyReport, AutoloadSetting, Declaration, DeclarationAdapter,
};
pub use error::AutoloadError;
pub use interceptor::{check_conflict, InterceptorInstaller};
pub use notifier::{CompletionCallback, CompletionNotifier, UnitDescriptor};
pub use orchestrator::{LoadAction, LoadOrchestrator, ResourceBody, ResourceCatalog, ResourceLoader};
pub use registry::{AutoloadEntry, AutoloadRegistry, RegistrationState, SharedRegistry};
pub use specifier::{
    parse_specifier, MemberKind, NamespacePath, Specifier, SpecifierError, ROOT_NAMESPACE,
};
pub use symbols::{not_found_handler, MissingHandler, SymbolTable, Value};
