//! RDF (Resource Description Framework) support
//!
//! This module holds the in-memory RDF model the pipelines work on:
//! - RDF terms and triples (subject-predicate-object)
//! - The prefix registry (prefix ↔ namespace URI)
//! - RDF serialization formats (Turtle, N-Triples, N3, TriG, N-Quads,
//!   RDF/XML, JSON-LD in; N-Triples and Turtle out)
//!
//! # Example
//!
//! ```rust
//! use tripledir::rdf::{RdfFormat, RdfParser, RdfSerializer};
//!
//! let graph = RdfParser::parse(
//!     "@prefix ex: <http://example.org/test#> .\nex:Person ex:label \"Person\"@en .",
//!     RdfFormat::Turtle,
//!     None,
//! )
//! .unwrap();
//! assert_eq!(graph.triples.len(), 1);
//! assert_eq!(graph.prefixes["ex"], "http://example.org/test#");
//!
//! let nt = RdfSerializer::serialize(&graph.triples, RdfFormat::NTriples).unwrap();
//! assert!(nt.contains("\"Person\"@en"));
//! ```

mod namespace;
mod serialization;
mod types;

pub use types::{
    BlankNode, Literal, NamedNode, RdfError, RdfObject, RdfPredicate, RdfResult, RdfSubject,
    Triple, OWL_ONTOLOGY, RDF_LANG_STRING, RDF_TYPE, XSD_STRING,
};

pub use namespace::{
    is_namespace_uri, local_name, split_uri, Namespace, PrefixError, PrefixRegistry,
    PrefixResult, PREFIXES_FILE,
};

pub use serialization::{
    ParseError, ParseResult, ParsedGraph, RdfFormat, RdfParser, RdfSerializer, SerializeError,
    SerializeResult,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdf_module_exports() {
        let registry = PrefixRegistry::with_defaults();
        assert!(!registry.is_empty());
        assert_eq!(RdfFormat::Turtle.name(), "turtle");
        assert!(NamedNode::new(RDF_TYPE).is_ok());
    }
}
