//! Autoload override file.
//!
//! Maps unit names to the trigger specifiers that should load them, for units
//! whose own declaration carries no autoload value:
//!
//! ```toml
//! [units]
//! slow_lib = ["SlowLib", "Module#foo"]
//! ```

use crate::error::ConfigError;
use crate::DeferloadConfig;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Parsed contents of an override file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoloadOverrides {
    /// Unit name → ordered list of specifier strings
    pub units: BTreeMap<String, Vec<String>>,
}

impl AutoloadOverrides {
    /// Load overrides from `path`. A missing file is an empty mapping.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            trace!("Autoload overrides not found at {:?}", path);
            return Ok(Self::default());
        }

        debug!("Loading autoload overrides from {:?}", path);
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
    }

    /// Specifiers configured for `unit`, if any.
    pub fn specifiers_for(&self, unit: &str) -> Option<&[String]> {
        self.units.get(unit).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Override file that is read at most once, on first access.
#[derive(Debug)]
pub struct LazyOverrides {
    path: PathBuf,
    cell: OnceCell<AutoloadOverrides>,
}

impl LazyOverrides {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Use the override file configured for `workspace_root`.
    pub fn from_config(config: &DeferloadConfig, workspace_root: &Path) -> Self {
        Self::new(config.overrides_path(workspace_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been read yet.
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Get the overrides, reading the file on first call.
    ///
    /// A failed read is not cached; the next call tries again.
    pub fn get(&self) -> Result<&AutoloadOverrides, ConfigError> {
        self.cell
            .get_or_try_init(|| AutoloadOverrides::load(&self.path))
    }
}
