//! Deterministic identifiers
//!
//! Every stored record is named by a UUID version 5 computed over a canonical
//! string in the URL namespace: the URI for a resource, the skolem URI for a
//! blank node, and `{subject}|{predicate}|{object}` for a statement. The
//! function is pure; the same input yields the same identifier on any
//! machine, forever.

pub mod skolem;

use crate::literal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use skolem::{skolem_base, skolem_uri, structural_hashes, SkolemMap, HASH_LEN};

/// Identifier errors
#[derive(Error, Debug)]
pub enum IdentifierError {
    /// Not a 36-character hyphenated UUID
    #[error("Invalid identifier '{0}'")]
    Invalid(String),
}

pub type IdentifierResult<T> = Result<T, IdentifierError>;

/// Record identifier, rendered as `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(Uuid);

impl Identifier {
    /// Identifier of a canonical string
    pub fn for_str(canonical: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, canonical.as_bytes()))
    }

    /// Parse the hyphenated form used in file names and wikilinks
    pub fn parse(s: &str) -> IdentifierResult<Self> {
        if s.len() != 36 {
            return Err(IdentifierError::Invalid(s.to_string()));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentifierError::Invalid(s.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// 32 hex digits without hyphens, used for exported blank node labels
    pub fn simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

/// Identifier for a canonical string
pub fn identifier_for(canonical: &str) -> Identifier {
    Identifier::for_str(canonical)
}

/// Canonical form of a literal: `"esc"`, `"esc"@lang` or `"esc"^^{datatype}`
///
/// The datatype is omitted for `xsd:string` and whenever a language is set.
pub fn canonical_literal(text: &str, language: Option<&str>, datatype: Option<&str>) -> String {
    let escaped = literal::escape(text);
    match (language, datatype) {
        (Some(lang), _) => format!("\"{}\"@{}", escaped, lang),
        (None, Some(dt)) if dt != crate::rdf::XSD_STRING => format!("\"{}\"^^{}", escaped, dt),
        _ => format!("\"{}\"", escaped),
    }
}

/// Pipe-joined canonical triple string
pub fn canonical_triple(subject: &str, predicate: &str, object: &str) -> String {
    format!("{}|{}|{}", subject, predicate, object)
}

/// Identifier of a statement from the canonical forms of its components
pub fn statement_identifier(subject: &str, predicate: &str, object: &str) -> Identifier {
    identifier_for(&canonical_triple(subject, predicate, object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_identifier() {
        let id = identifier_for("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
        assert_eq!(id.to_string(), "73b69787-81ea-563e-8e09-9c84cad4cf2b");
    }

    #[test]
    fn test_deterministic_and_distinct() {
        let a = identifier_for("http://example.org/test#Person");
        let b = identifier_for("http://example.org/test#Person");
        let c = identifier_for("http://example.org/test#person");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_uuid().get_version_num(), 5);
    }

    #[test]
    fn test_parse() {
        let id = identifier_for("http://example.org/");
        let parsed: Identifier = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.simple().len(), 32);

        assert!(Identifier::parse("not-an-id").is_err());
        // simple form is not accepted where the hyphenated form is required
        assert!(Identifier::parse(&id.simple()).is_err());
    }

    #[test]
    fn test_canonical_literal() {
        assert_eq!(canonical_literal("Person", Some("en"), None), "\"Person\"@en");
        assert_eq!(
            canonical_literal("42", None, Some("http://www.w3.org/2001/XMLSchema#integer")),
            "\"42\"^^http://www.w3.org/2001/XMLSchema#integer"
        );
        assert_eq!(
            canonical_literal("x", None, Some("http://www.w3.org/2001/XMLSchema#string")),
            "\"x\""
        );
        assert_eq!(canonical_literal("a \"b\"\n", None, None), "\"a \\\"b\\\"\\n\"");
    }

    #[test]
    fn test_statement_identifier() {
        let canonical = canonical_triple(
            "http://example.org/test#Person",
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
            "http://www.w3.org/2002/07/owl#Class",
        );
        assert_eq!(
            canonical,
            "http://example.org/test#Person|http://www.w3.org/1999/02/22-rdf-syntax-ns#type|http://www.w3.org/2002/07/owl#Class"
        );
        assert_eq!(
            statement_identifier(
                "http://example.org/test#Person",
                "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
                "http://www.w3.org/2002/07/owl#Class",
            ),
            identifier_for(&canonical)
        );
    }
}
