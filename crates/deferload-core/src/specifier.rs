//! Trigger Specifier Parser
//!
//! A specifier names the symbol whose first access loads a unit.
//!
//! Format: `{namespace}{separator}{member}` where the separator selects the
//! kind of member:
//! - `Foo::Bar` → constant `Bar` in namespace `Foo`
//! - `Foo#bar` → instance member `bar` of `Foo`
//! - `Foo.bar` → namespace-level member `bar` of `Foo`
//! - `Bar` → constant `Bar` in the root namespace (`Object::Bar`)
//!
//! The right-most separator wins, so `A::B.c` is member `c` of `A::B`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the root namespace that bare specifiers live in.
pub const ROOT_NAMESPACE: &str = "Object";

// ============================================================================
// Member Kind
// ============================================================================

/// What kind of member a specifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberKind {
    /// Constant lookup (`::`)
    Constant,
    /// Member called on instances of the namespace (`#`)
    InstanceMember,
    /// Member called on the namespace itself (`.`)
    NamespaceMember,
}

impl MemberKind {
    pub const ALL: [MemberKind; 3] = [
        MemberKind::Constant,
        MemberKind::InstanceMember,
        MemberKind::NamespaceMember,
    ];

    /// Separator used in the string form.
    pub fn separator(&self) -> &'static str {
        match self {
            MemberKind::Constant => "::",
            MemberKind::InstanceMember => "#",
            MemberKind::NamespaceMember => ".",
        }
    }

    /// Human-readable kind, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            MemberKind::Constant => "constant",
            MemberKind::InstanceMember => "instance member",
            MemberKind::NamespaceMember => "namespace member",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

// ============================================================================
// Namespace Path
// ============================================================================

/// Ordered, non-empty sequence of namespace segments (`Foo::Bar`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacePath(Vec<String>);

impl NamespacePath {
    /// The root namespace, `Object`.
    pub fn root() -> Self {
        Self(vec![ROOT_NAMESPACE.to_string()])
    }

    /// Parse a `::`-separated path, validating every segment.
    pub fn parse(text: &str) -> Result<Self, SpecifierError> {
        let segments: Vec<String> = text.split("::").map(str::to_string).collect();
        for segment in &segments {
            if !is_identifier(segment) {
                return Err(SpecifierError::InvalidSegment {
                    segment: segment.clone(),
                    text: text.to_string(),
                });
            }
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1 && self.0[0] == ROOT_NAMESPACE
    }

    /// Specifier for `member` of the given kind inside this namespace.
    pub fn member(&self, kind: MemberKind, member: impl Into<String>) -> Specifier {
        Specifier::new(self.clone(), kind, member)
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("::"))
    }
}

impl FromStr for NamespacePath {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ============================================================================
// Specifier
// ============================================================================

/// Canonical identity of a trigger point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Specifier {
    pub namespace: NamespacePath,
    pub kind: MemberKind,
    pub member: String,
}

impl Specifier {
    pub fn new(namespace: NamespacePath, kind: MemberKind, member: impl Into<String>) -> Self {
        Self {
            namespace,
            kind,
            member: member.into(),
        }
    }

    /// Constant in the root namespace.
    pub fn constant(member: impl Into<String>) -> Self {
        Self::new(NamespacePath::root(), MemberKind::Constant, member)
    }

    /// String form, the exact inverse of [`parse_specifier`].
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.namespace,
            self.kind.separator(),
            self.member
        )
    }
}

impl FromStr for Specifier {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_specifier(s)
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Errors that can occur while parsing a specifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecifierError {
    /// Nothing to parse
    #[error("empty autoload specifier")]
    Empty,

    /// Separator present but no member name after it
    #[error("autoload specifier '{0}' has no member name")]
    MissingMember(String),

    /// A namespace segment is not an identifier
    #[error("invalid namespace segment '{segment}' in '{text}'")]
    InvalidSegment { segment: String, text: String },
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a specifier string.
///
/// # Examples
///
/// ```
/// use deferload_core::specifier::{parse_specifier, MemberKind};
///
/// let spec = parse_specifier("Module#foo").unwrap();
/// assert_eq!(spec.kind, MemberKind::InstanceMember);
/// assert_eq!(spec.member, "foo");
///
/// // Bare names are root constants
/// let spec = parse_specifier("SlowLib").unwrap();
/// assert_eq!(spec.to_string(), "Object::SlowLib");
/// ```
pub fn parse_specifier(text: &str) -> Result<Specifier, SpecifierError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SpecifierError::Empty);
    }

    let candidates = [
        (text.rfind("::"), MemberKind::Constant),
        (text.rfind('#'), MemberKind::InstanceMember),
        (text.rfind('.'), MemberKind::NamespaceMember),
    ];
    let split = candidates
        .iter()
        .filter_map(|(pos, kind)| pos.map(|p| (p, *kind)))
        .max_by_key(|(pos, _)| *pos);

    let Some((pos, kind)) = split else {
        return Ok(Specifier::constant(text));
    };

    let member = &text[pos + kind.separator().len()..];
    if member.is_empty() {
        return Err(SpecifierError::MissingMember(text.to_string()));
    }

    let namespace = NamespacePath::parse(&text[..pos])?;
    Ok(Specifier::new(namespace, kind, member))
}
