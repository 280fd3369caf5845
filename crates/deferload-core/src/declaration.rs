//! Dependency Declaration Adapter
//!
//! Turns declared units into autoload registrations. For each unit:
//! - the resource paths are the ones the declaration names (explicit) or,
//!   failing that, the unit's own name (implicit, a best-effort guess)
//! - the trigger specifiers come from its `autoload` value, or from the
//!   override file when the declaration has none
//! - units with specifiers are registered for deferred loading, all others
//!   are loaded immediately
//!
//! `autoload` accepts the same shapes a manifest would carry:
//!
//! ```toml
//! autoload = true                     # infer from the unit name
//! autoload = "OtherName"              # one specifier
//! autoload = ["SlowLib", "Module#foo"]
//! autoload = false                    # never autoload, ignore overrides
//! ```

use crate::autoloader::Autoloader;
use crate::error::AutoloadError;
use crate::notifier::UnitDescriptor;
use deferload_config::LazyOverrides;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Autoload Setting
// ============================================================================

/// Declared `autoload` value of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAutoload", into = "RawAutoload")]
pub enum AutoloadSetting {
    /// Explicitly off
    Disabled,
    /// Derive one constant from the unit name
    Infer,
    /// Use these specifier strings
    Specifiers(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawAutoload {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl From<RawAutoload> for AutoloadSetting {
    fn from(raw: RawAutoload) -> Self {
        match raw {
            RawAutoload::Flag(true) => AutoloadSetting::Infer,
            RawAutoload::Flag(false) => AutoloadSetting::Disabled,
            RawAutoload::One(s) => AutoloadSetting::Specifiers(vec![s]),
            RawAutoload::Many(v) => AutoloadSetting::Specifiers(v),
        }
    }
}

impl From<AutoloadSetting> for RawAutoload {
    fn from(setting: AutoloadSetting) -> Self {
        match setting {
            AutoloadSetting::Disabled => RawAutoload::Flag(false),
            AutoloadSetting::Infer => RawAutoload::Flag(true),
            AutoloadSetting::Specifiers(v) => RawAutoload::Many(v),
        }
    }
}

impl AutoloadSetting {
    /// Specifier strings for a unit called `unit_name`, `None` when off.
    pub fn normalize(&self, unit_name: &str) -> Option<Vec<String>> {
        match self {
            AutoloadSetting::Disabled => None,
            AutoloadSetting::Infer => Some(vec![infer_namespace(unit_name)]),
            AutoloadSetting::Specifiers(v) if v.is_empty() => None,
            AutoloadSetting::Specifiers(v) => Some(v.clone()),
        }
    }
}

/// Derive a constant name from a unit name.
///
/// Runs of non-word characters and underscores become segment breaks, each
/// segment is capitalised and the breaks are dropped. A leading digit gets an
/// underscore prefix.
///
/// ```
/// use deferload_core::declaration::infer_namespace;
///
/// assert_eq!(infer_namespace("slow_lib"), "SlowLib");
/// assert_eq!(infer_namespace("ruby-prof"), "RubyProf");
/// assert_eq!(infer_namespace("3scale"), "_3scale");
/// ```
pub fn infer_namespace(unit_name: &str) -> String {
    let mut collapsed: Vec<char> = Vec::with_capacity(unit_name.len());
    for c in unit_name.chars() {
        if c.is_ascii_alphanumeric() {
            collapsed.push(c);
        } else if collapsed.last() != Some(&'_') {
            collapsed.push('_');
        }
    }

    let mut inferred = String::with_capacity(collapsed.len());
    let mut i = 0;
    while i < collapsed.len() {
        if i == 0 {
            inferred.extend(collapsed[0].to_uppercase());
            i += 1;
        } else if collapsed[i] == '_' && i + 1 < collapsed.len() {
            inferred.extend(collapsed[i + 1].to_uppercase());
            i += 2;
        } else {
            inferred.push(collapsed[i]);
            i += 1;
        }
    }

    if inferred.starts_with(|c: char| c.is_ascii_digit()) {
        inferred.insert(0, '_');
    }
    inferred
}

// ============================================================================
// Declaration
// ============================================================================

/// One declared unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Resource paths named by the user; `None` means "guess from the name"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoload: Option<AutoloadSetting>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            require: None,
            autoload: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_require<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_autoload(mut self, setting: AutoloadSetting) -> Self {
        self.autoload = Some(setting);
        self
    }

    /// Whether the resource paths were named by the user.
    pub fn is_explicit(&self) -> bool {
        self.require.is_some()
    }

    /// Resource paths to load for this unit.
    pub fn resource_paths(&self) -> Vec<String> {
        match &self.require {
            Some(paths) => paths.clone(),
            None => vec![self.name.clone()],
        }
    }

    fn descriptor(&self, autoload: &[String]) -> UnitDescriptor {
        UnitDescriptor {
            name: self.name.clone(),
            version: self.version.clone(),
            resources: self.resource_paths(),
            autoload: autoload.to_vec(),
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Outcome of applying a set of declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Units registered for deferred loading
    pub deferred: Vec<String>,
    /// Units loaded immediately
    pub loaded: Vec<String>,
    /// Units with no resource paths, so nothing to load or defer
    pub skipped: Vec<String>,
}

/// Feeds declarations into an [`Autoloader`].
pub struct DeclarationAdapter<'a> {
    autoloader: &'a Autoloader,
    overrides: Option<&'a LazyOverrides>,
}

impl<'a> DeclarationAdapter<'a> {
    pub fn new(autoloader: &'a Autoloader) -> Self {
        Self {
            autoloader,
            overrides: None,
        }
    }

    /// Consult `overrides` for units that declare no `autoload` value.
    pub fn with_overrides(mut self, overrides: &'a LazyOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Specifiers for `declaration`, reading the override file on first need.
    pub fn specifiers_for(
        &self,
        declaration: &Declaration,
    ) -> Result<Option<Vec<String>>, AutoloadError> {
        if let Some(setting) = &declaration.autoload {
            return Ok(setting.normalize(&declaration.name));
        }
        let Some(overrides) = self.overrides else {
            return Ok(None);
        };
        Ok(overrides
            .get()?
            .specifiers_for(&declaration.name)
            .filter(|specs| !specs.is_empty())
            .map(<[String]>::to_vec))
    }

    /// Register or load every declared unit, in declaration order.
    pub fn apply(&self, declarations: &[Declaration]) -> Result<ApplyReport, AutoloadError> {
        let plans = declarations
            .iter()
            .map(|d| Ok((d, self.specifiers_for(d)?)))
            .collect::<Result<Vec<_>, AutoloadError>>()?;

        self.autoloader.index_units(
            plans
                .iter()
                .map(|(d, specs)| d.descriptor(specs.as_deref().unwrap_or_default())),
        );

        let mut report = ApplyReport::default();
        for (declaration, specifiers) in plans {
            let explicit = declaration.is_explicit();
            let resources = declaration.resource_paths();
            if resources.is_empty() {
                if specifiers.is_some() {
                    warn!(
                        "Unit '{}' requires no resources; its autoload triggers are ignored",
                        declaration.name
                    );
                }
                report.skipped.push(declaration.name.clone());
                continue;
            }
            match specifiers {
                Some(specifiers) => {
                    for resource in &resources {
                        self.autoloader.register_autoload(
                            specifiers.as_slice(),
                            resource,
                            explicit,
                            &declaration.name,
                        )?;
                    }
                    debug!(
                        "Deferred '{}' until {}",
                        declaration.name,
                        specifiers.join(", ")
                    );
                    report.deferred.push(declaration.name.clone());
                }
                None => {
                    for resource in &resources {
                        self.autoloader.require(resource, explicit)?;
                    }
                    report.loaded.push(declaration.name.clone());
                }
            }
        }

        info!(
            "Applied {} declaration(s): {} deferred, {} loaded, {} skipped",
            declarations.len(),
            report.deferred.len(),
            report.loaded.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}
