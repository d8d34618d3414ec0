//! Relocation namespaces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A dotted package prefix under which relocated classes are nested.
///
/// Every segment must be a non-empty Java identifier made of ASCII letters,
/// digits, `_` or `$`, not starting with a digit. The slash form is the
/// prefix of internal class names and archive entry paths.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace {
    dotted: String,
    slashed: String,
}

/// Reasons a namespace string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// The namespace string was empty.
    #[error("namespace must not be empty")]
    Empty,

    /// A segment between dots was empty (`a..b`, `.a`, `a.`).
    #[error("namespace `{0}` contains an empty segment")]
    EmptySegment(String),

    /// A segment contained a character that cannot appear in a package name.
    #[error("namespace `{namespace}` has invalid segment `{segment}`")]
    InvalidSegment {
        /// The full namespace text.
        namespace: String,
        /// The offending segment.
        segment: String,
    },
}

impl Namespace {
    /// Validates and creates a namespace from its dotted form.
    pub fn new(dotted: &str) -> Result<Self, NamespaceError> {
        if dotted.is_empty() {
            return Err(NamespaceError::Empty);
        }
        for segment in dotted.split('.') {
            if segment.is_empty() {
                return Err(NamespaceError::EmptySegment(dotted.to_string()));
            }
            if !is_identifier(segment) {
                return Err(NamespaceError::InvalidSegment {
                    namespace: dotted.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
        Ok(Self {
            dotted: dotted.to_string(),
            slashed: dotted.replace('.', "/"),
        })
    }

    /// The dotted form, e.g. `eu.example.libs`.
    pub fn dotted(&self) -> &str {
        &self.dotted
    }

    /// The slash form, e.g. `eu/example/libs`.
    pub fn slashed(&self) -> &str {
        &self.slashed
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl FromStr for Namespace {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = NamespaceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.dotted
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", self.dotted)
    }
}
