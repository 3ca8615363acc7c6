//! Stored records
//!
//! One record per file, four kinds:
//! - namespace: a vocabulary's base URI
//! - anchor: a named resource (class, property, individual)
//! - blank node: a skolemized blank node
//! - statement: one triple, its terms held as references or an inline literal
//!
//! The on-disk grammar lives in [`frontmatter`] and nowhere else.

pub mod frontmatter;
mod index;
mod store;

use crate::literal::{LiteralError, LiteralValue};
use crate::reference::{Reference, ReferenceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use index::{Collision, IndexEntry, RecordIndex};
pub use store::{RecordIter, RecordStore, SaveOutcome, StoreError, StoreResult, StoredRecord, RECORD_EXTENSION};

/// Record syntax errors
#[derive(Error, Debug)]
pub enum RecordError {
    /// No `---` delimited header
    #[error("Missing frontmatter block")]
    MissingFrontmatter,

    /// Header is not valid YAML for a record
    #[error("Invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Unknown `metadata` tag
    #[error("Unknown record kind '{0}'")]
    UnknownKind(String),

    /// Required field absent for the kind
    #[error("{kind} record is missing required field '{field}'")]
    MissingField { kind: String, field: &'static str },

    /// Field outside the kind's allowed set
    #[error("{kind} record has unexpected field '{field}'")]
    UnexpectedField { kind: String, field: String },

    /// Reference field that does not parse
    #[error("Invalid reference in field '{field}': {source}")]
    InvalidReference {
        field: &'static str,
        #[source]
        source: ReferenceError,
    },

    /// Literal object that does not parse
    #[error("Invalid literal in field '{field}': {source}")]
    InvalidLiteral {
        field: &'static str,
        #[source]
        source: LiteralError,
    },
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Record kind, the `metadata` tag on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Namespace,
    Anchor,
    BlankNode,
    Statement,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Namespace => "namespace",
            RecordKind::Anchor => "anchor",
            RecordKind::BlankNode => "blank_node",
            RecordKind::Statement => "statement",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "namespace" => Ok(RecordKind::Namespace),
            "anchor" => Ok(RecordKind::Anchor),
            "blank_node" => Ok(RecordKind::BlankNode),
            "statement" => Ok(RecordKind::Statement),
            other => Err(RecordError::UnknownKind(other.to_string())),
        }
    }
}

/// Object of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementObject {
    Reference(Reference),
    Literal(LiteralValue),
}

impl StatementObject {
    fn normalized(&self) -> Self {
        match self {
            StatementObject::Reference(r) => StatementObject::Reference(r.normalized()),
            StatementObject::Literal(l) => StatementObject::Literal(LiteralValue {
                datatype: l.datatype.as_ref().map(Reference::normalized),
                ..l.clone()
            }),
        }
    }
}

impl fmt::Display for StatementObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementObject::Reference(r) => write!(f, "{}", r),
            StatementObject::Literal(l) => write!(f, "{}", l),
        }
    }
}

/// Kind-specific record fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    Namespace {
        uri: String,
    },
    Anchor {
        /// Absent when the anchor was created before its URI was known
        uri: Option<String>,
    },
    BlankNode {
        /// Skolem URI
        uri: String,
    },
    Statement {
        subject: Reference,
        predicate: Reference,
        object: StatementObject,
    },
}

impl RecordData {
    /// Same fields with wikilink aliases removed and external URIs turned
    /// into the wikilinks they stand for; two records with equal normalized
    /// data describe the same thing
    pub fn normalized(&self) -> RecordData {
        match self {
            RecordData::Statement {
                subject,
                predicate,
                object,
            } => RecordData::Statement {
                subject: subject.normalized(),
                predicate: predicate.normalized(),
                object: object.normalized(),
            },
            other => other.clone(),
        }
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: RecordData,
    /// Display aliases, first one is the primary
    pub aliases: Vec<String>,
    /// Free-form content after the header
    pub body: String,
}

impl Record {
    fn new(data: RecordData) -> Self {
        Self {
            data,
            aliases: Vec::new(),
            body: String::new(),
        }
    }

    pub fn namespace(uri: impl Into<String>) -> Self {
        Self::new(RecordData::Namespace { uri: uri.into() })
    }

    pub fn anchor(uri: impl Into<String>) -> Self {
        Self::new(RecordData::Anchor {
            uri: Some(uri.into()),
        })
    }

    pub fn blank_node(skolem_uri: impl Into<String>) -> Self {
        Self::new(RecordData::BlankNode {
            uri: skolem_uri.into(),
        })
    }

    pub fn statement(subject: Reference, predicate: Reference, object: StatementObject) -> Self {
        Self::new(RecordData::Statement {
            subject,
            predicate,
            object,
        })
    }

    /// Builder: add a display alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn kind(&self) -> RecordKind {
        match self.data {
            RecordData::Namespace { .. } => RecordKind::Namespace,
            RecordData::Anchor { .. } => RecordKind::Anchor,
            RecordData::BlankNode { .. } => RecordKind::BlankNode,
            RecordData::Statement { .. } => RecordKind::Statement,
        }
    }

    /// Source URI of namespace, anchor and blank node records
    pub fn uri(&self) -> Option<&str> {
        match &self.data {
            RecordData::Namespace { uri } | RecordData::BlankNode { uri } => Some(uri),
            RecordData::Anchor { uri } => uri.as_deref(),
            RecordData::Statement { .. } => None,
        }
    }

    /// References held by a statement, with the field each came from;
    /// literal datatypes are reported under `object`
    pub fn references(&self) -> Vec<(&'static str, &Reference)> {
        match &self.data {
            RecordData::Statement {
                subject,
                predicate,
                object,
            } => {
                let mut refs = vec![("subject", subject), ("predicate", predicate)];
                match object {
                    StatementObject::Reference(r) => refs.push(("object", r)),
                    StatementObject::Literal(LiteralValue {
                        datatype: Some(dt), ..
                    }) => refs.push(("object", dt)),
                    StatementObject::Literal(_) => {}
                }
                refs
            }
            _ => Vec::new(),
        }
    }

    /// Whether two records carry the same data, ignoring aliases and body
    pub fn same_content(&self, other: &Record) -> bool {
        self.data.normalized() == other.data.normalized()
    }

    /// Render to the on-disk text
    pub fn render(&self) -> RecordResult<String> {
        frontmatter::render(self)
    }

    /// Parse the on-disk text
    pub fn parse(text: &str) -> RecordResult<Record> {
        frontmatter::parse(text)
    }
}
