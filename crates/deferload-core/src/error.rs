//! Error types for the autoload engine.

use crate::specifier::{Specifier, SpecifierError};
use thiserror::Error;

/// Errors raised while registering, intercepting or loading units.
#[derive(Debug, Error)]
pub enum AutoloadError {
    /// The trigger symbol already resolves, so it can never trigger a load
    #[error("cannot autoload `{specifier}': it is already defined")]
    RegistrationConflict { specifier: Specifier },

    /// The responsible unit(s) loaded without defining the trigger symbol
    #[error("unit did not autoload `{specifier}'")]
    UnmetAutoloadContract { specifier: Specifier },

    /// A resource could not be found by the resource loader
    #[error("cannot load such resource -- {resource}")]
    ResourceNotFound { resource: String },

    /// A resource was found but failed while loading
    #[error("failed to load resource '{resource}': {message}")]
    LoadFailed { resource: String, message: String },

    /// Ordinary lookup failure from the symbol table
    #[error("undefined {} `{specifier}'", .specifier.kind.describe())]
    NameNotFound { specifier: Specifier },

    /// Malformed trigger specifier
    #[error(transparent)]
    InvalidSpecifier(#[from] SpecifierError),

    /// The process-wide autoloader was initialised twice
    #[error("process-wide autoloader is already initialised")]
    AlreadyInitialized,

    /// Override configuration could not be read
    #[error(transparent)]
    Config(#[from] deferload_config::ConfigError),
}

impl AutoloadError {
    pub fn conflict(specifier: Specifier) -> Self {
        Self::RegistrationConflict { specifier }
    }

    pub fn unmet_contract(specifier: Specifier) -> Self {
        Self::UnmetAutoloadContract { specifier }
    }

    pub fn resource_not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
        }
    }

    pub fn load_failed(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn name_not_found(specifier: Specifier) -> Self {
        Self::NameNotFound { specifier }
    }

    /// True for the ordinary "no such symbol" outcome.
    pub fn is_name_not_found(&self) -> bool {
        matches!(self, Self::NameNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let spec: Specifier = "String#wrong_method".parse().unwrap();
        let err = AutoloadError::unmet_contract(spec.clone());
        assert_eq!(err.to_string(), "unit did not autoload `String#wrong_method'");

        let err = AutoloadError::name_not_found(spec);
        assert_eq!(
            err.to_string(),
            "undefined instance member `String#wrong_method'"
        );

        let err = AutoloadError::resource_not_found("slow_lib");
        assert_eq!(err.to_string(), "cannot load such resource -- slow_lib");
    }
}
