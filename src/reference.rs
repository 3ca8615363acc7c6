//! Reference syntax used inside statement records
//!
//! - `[[identifier]]` / `[[identifier|alias]]` points at a stored record
//! - `<uri>` is an external resource with no local record
//! - `!prefix` is namespace shorthand
//!
//! The alias segment of a wikilink is cosmetic and never takes part in
//! resolution.

use crate::identity::{identifier_for, Identifier};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static PREFIX_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid prefix pattern"));

/// Reference errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Neither a wikilink, an external URI nor a namespace shorthand
    #[error("Invalid reference '{0}'")]
    Invalid(String),

    /// Wikilink whose target is not an identifier
    #[error("Invalid identifier in wikilink '{0}'")]
    InvalidIdentifier(String),
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Parsed reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Link to a stored record
    Wikilink {
        id: Identifier,
        alias: Option<String>,
    },
    /// Resource that is not materialized locally
    External(String),
    /// Namespace shorthand (`!prefix`)
    Namespace(String),
}

impl Reference {
    pub fn wikilink(id: Identifier) -> Self {
        Reference::Wikilink { id, alias: None }
    }

    pub fn aliased(id: Identifier, alias: impl Into<String>) -> Self {
        Reference::Wikilink {
            id,
            alias: Some(alias.into()),
        }
    }

    pub fn external(uri: impl Into<String>) -> Self {
        Reference::External(uri.into())
    }

    /// Parse any of the three reference forms
    pub fn parse(text: &str) -> ReferenceResult<Self> {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix("[[").and_then(|t| t.strip_suffix("]]")) {
            let (target, alias) = match inner.split_once('|') {
                Some((target, alias)) => (target, Some(alias.to_string())),
                None => (inner, None),
            };
            let id = Identifier::parse(target.trim())
                .map_err(|_| ReferenceError::InvalidIdentifier(text.to_string()))?;
            return Ok(Reference::Wikilink { id, alias });
        }
        if let Some(uri) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            if uri.is_empty() || uri.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
                return Err(ReferenceError::Invalid(text.to_string()));
            }
            return Ok(Reference::External(uri.to_string()));
        }
        if let Some(prefix) = text.strip_prefix('!') {
            if PREFIX_NAME.is_match(prefix) {
                return Ok(Reference::Namespace(prefix.to_string()));
            }
        }
        Err(ReferenceError::Invalid(text.to_string()))
    }

    /// Identifier of a wikilink target
    pub fn identifier(&self) -> Option<Identifier> {
        match self {
            Reference::Wikilink { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Same target, alias dropped
    pub fn without_alias(&self) -> Self {
        match self {
            Reference::Wikilink { id, .. } => Reference::wikilink(*id),
            other => other.clone(),
        }
    }

    /// Form used to compare references: an external URI and a wikilink to
    /// the record that URI names are the same target
    pub fn normalized(&self) -> Self {
        match self {
            Reference::External(uri) => Reference::wikilink(identifier_for(uri)),
            other => other.without_alias(),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Reference::External(_))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Wikilink { id, alias: None } => write!(f, "[[{}]]", id),
            Reference::Wikilink { id, alias: Some(alias) } => write!(f, "[[{}|{}]]", id, alias),
            Reference::External(uri) => write!(f, "<{}>", uri),
            Reference::Namespace(prefix) => write!(f, "!{}", prefix),
        }
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
