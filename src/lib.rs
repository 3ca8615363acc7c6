//! tripledir
//!
//! Stores an RDF ontology as a directory of small text records, one file per
//! resource or per triple, each named by a deterministic UUID. Ontologies
//! round-trip: import a Turtle/RDF-XML/JSON-LD document, validate the
//! records, export them back to RDF and verify the result against the
//! original.
//!
//! # Layout
//!
//! - [`identity`]: URI → identifier, canonical triples, blank node skolemization
//! - [`literal`]: on-disk literal codec
//! - [`reference`]: `[[id]]`, `<uri>` and `!prefix` references
//! - [`record`]: record model, frontmatter grammar, store and index
//! - [`resolve`]: URI ↔ reference conversion and display aliases
//! - [`rdf`]: RDF terms, prefix registry, parsers and serializers
//! - [`pipeline`]: import, export, validate, relink, verify
//!
//! ## Example Usage
//!
//! ```rust
//! use tripledir::{identifier_for, statement_identifier};
//!
//! let person = identifier_for("http://example.org/test#Person");
//! assert_eq!(person, identifier_for("http://example.org/test#Person"));
//!
//! let typed = statement_identifier(
//!     "http://example.org/test#Person",
//!     "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
//!     "http://www.w3.org/2002/07/owl#Class",
//! );
//! assert_ne!(typed, person);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod identity;
pub mod literal;
pub mod pipeline;
pub mod rdf;
pub mod record;
pub mod reference;
pub mod resolve;

// Re-export main types for convenience
pub use identity::{
    canonical_literal, canonical_triple, identifier_for, statement_identifier, Identifier,
    IdentifierError, SkolemMap,
};

pub use literal::{LiteralError, LiteralValue};

pub use reference::{Reference, ReferenceError};

pub use record::{
    Record, RecordData, RecordError, RecordIndex, RecordKind, RecordStore, SaveOutcome,
    StatementObject, StoreError, StoreResult, StoredRecord,
};

pub use resolve::{ResolveError, ResolvedTarget, Resolver};

pub use rdf::{PrefixError, PrefixRegistry, RdfFormat, RdfParser, RdfSerializer};

pub use pipeline::{
    export, import, relink, validate, verify, ExportError, ExportResult, ExportStats, ImportError,
    ImportOptions, ImportStats, Issue, IssueKind, ItemError, RelinkStats, Severity,
    ValidationReport, VerifyError, VerifyOptions, VerifyReport,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
