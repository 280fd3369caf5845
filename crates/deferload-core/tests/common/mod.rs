//! Common test utilities for integration tests.
//!
//! [`World`] bundles an autoloader with an in-memory resource catalog and an
//! output log resources can write to, so a scenario reads like a small
//! program: provide some resources, declare some units, access symbols.

#![allow(dead_code)]

use std::sync::Arc;

use deferload_core::{
    AutoloadError, Autoloader, Declaration, DeclarationAdapter, ResourceCatalog, Specifier,
    SymbolTable,
};
use parking_lot::Mutex;
use serde_json::json;

pub struct World {
    pub autoloader: Autoloader,
    pub catalog: Arc<ResourceCatalog>,
    pub output: Arc<Mutex<Vec<String>>>,
}

impl World {
    pub fn new() -> Self {
        let catalog = Arc::new(ResourceCatalog::new());
        let autoloader = Autoloader::new(Arc::new(SymbolTable::new()), catalog.clone());
        Self {
            autoloader,
            catalog,
            output: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provide a resource that defines every specifier in `defines`.
    pub fn provide_defining(&self, resource: &str, defines: &[&str]) {
        let defines: Vec<Specifier> = defines
            .iter()
            .map(|d| d.parse().expect("valid specifier"))
            .collect();
        self.catalog.provide(resource, move |symbols| {
            for spec in &defines {
                symbols.define(spec, json!(100));
            }
            Ok(())
        });
    }

    /// Provide a resource that runs `body` with access to the output log.
    pub fn provide_with_output<F>(&self, resource: &str, body: F)
    where
        F: Fn(&SymbolTable, &Mutex<Vec<String>>) -> Result<(), AutoloadError>
            + Send
            + Sync
            + 'static,
    {
        let output = Arc::clone(&self.output);
        self.catalog
            .provide(resource, move |symbols| body(symbols, &output));
    }

    pub fn apply(&self, declarations: &[Declaration]) {
        DeclarationAdapter::new(&self.autoloader)
            .apply(declarations)
            .expect("declarations apply cleanly");
    }

    pub fn is_defined(&self, specifier: &str) -> bool {
        self.autoloader
            .symbols()
            .is_defined(&specifier.parse().expect("valid specifier"))
    }

    pub fn output(&self) -> Vec<String> {
        self.output.lock().clone()
    }
}
