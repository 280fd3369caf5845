//! Deferload Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.deferload/config.toml`
//! - Local config: `.deferload/config.toml` (in workspace)
//! - Programmatic overrides via `ConfigOverrides`
//! - The autoload override file (unit name → trigger specifiers)
//! - Logging initialisation for host programs
//!
//! Configuration is merged in order: global → local → overrides.

mod error;
mod loader;
pub mod logging;
mod overrides;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use logging::init_logging;
pub use overrides::{AutoloadOverrides, LazyOverrides};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the autoload override file, relative to the workspace.
pub const DEFAULT_OVERRIDES_FILE: &str = ".deferload/autoload.toml";

/// Root configuration for Deferload.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DeferloadConfig {
    /// Autoload configuration
    pub autoload: AutoloadConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Autoload configuration.
///
/// # Example TOML
///
/// ```toml
/// [autoload]
/// overrides_file = "config/autoload.toml"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutoloadConfig {
    /// Path of the override file mapping unit names to trigger specifiers
    pub overrides_file: PathBuf,
}

impl Default for AutoloadConfig {
    fn default() -> Self {
        Self {
            overrides_file: PathBuf::from(DEFAULT_OVERRIDES_FILE),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// Programmatic overrides for configuration values.
///
/// Applied over file-based config, e.g. from environment variables of the
/// host program.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override the autoload override file path
    pub overrides_file: Option<PathBuf>,

    /// Override log level
    pub log_level: Option<String>,
}

impl DeferloadConfig {
    /// Apply overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref path) = overrides.overrides_file {
            self.autoload.overrides_file = path.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Get the effective override file path for a workspace.
    pub fn overrides_path(&self, workspace_root: &Path) -> PathBuf {
        if self.autoload.overrides_file.is_absolute() {
            self.autoload.overrides_file.clone()
        } else {
            workspace_root.join(&self.autoload.overrides_file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeferloadConfig::default();
        assert_eq!(
            config.autoload.overrides_file,
            PathBuf::from(".deferload/autoload.toml")
        );
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = DeferloadConfig::default();
        let overrides = ConfigOverrides {
            overrides_file: Some(PathBuf::from("/etc/deferload/units.toml")),
            log_level: Some("debug".to_string()),
        };

        config.apply_overrides(&overrides);

        assert_eq!(
            config.autoload.overrides_file,
            PathBuf::from("/etc/deferload/units.toml")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_overrides_path_relative() {
        let config = DeferloadConfig::default();
        let path = config.overrides_path(Path::new("/home/user/app"));
        assert_eq!(
            path,
            PathBuf::from("/home/user/app/.deferload/autoload.toml")
        );
    }

    #[test]
    fn test_overrides_path_absolute() {
        let mut config = DeferloadConfig::default();
        config.autoload.overrides_file = PathBuf::from("/srv/autoload.toml");
        let path = config.overrides_path(Path::new("/home/user/app"));
        assert_eq!(path, PathBuf::from("/srv/autoload.toml"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: DeferloadConfig = toml::from_str(
            r#"
            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.autoload, AutoloadConfig::default());
    }
}
