//! RDF/XML format implementation

use crate::rdf::{RdfPredicate, Triple};
use super::turtle::{convert_object, convert_subject};
use super::{ParseError, ParseResult, RdfFormat};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use oxiri::Iri;
use regex::Regex;
use rio_api::parser::TriplesParser;
use rio_xml::{RdfXmlError, RdfXmlParser};
use std::io;

static XMLNS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"xmlns:([A-Za-z_][A-Za-z0-9_.\-]*)\s*=\s*["']([^"']*)["']"#)
        .expect("valid xmlns pattern")
});

/// `xmlns:prefix` declarations in document order, `rdf` and `xml` included
pub(super) fn declared_prefixes(input: &str) -> IndexMap<String, String> {
    XMLNS_DECL
        .captures_iter(input)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// RDF/XML parser
pub struct RdfXmlParserWrapper;

impl RdfXmlParserWrapper {
    /// Parse RDF/XML string to Triples
    pub fn parse(input: &str, base: Option<Iri<String>>) -> ParseResult<Vec<Triple>> {
        let mut parser = RdfXmlParser::new(input.as_bytes(), base);
        let mut triples = Vec::new();

        let res: Result<(), RdfXmlError> = parser.parse_all(&mut |t| {
            let predicate = RdfPredicate::new(t.predicate.iri)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            triples.push(Triple::new(
                convert_subject(t.subject)?,
                predicate,
                convert_object(t.object)?,
            ));
            Ok(())
        });

        res.map(|_| triples)
            .map_err(|e| ParseError::syntax(RdfFormat::RdfXml, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::RdfObject;

    const ONTOLOGY: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:owl="http://www.w3.org/2002/07/owl#"
         xmlns:ex="http://example.org/test#">
  <owl:Class rdf:about="http://example.org/test#Person">
    <rdfs:label xml:lang="en">Person</rdfs:label>
    <rdfs:subClassOf>
      <owl:Restriction>
        <owl:onProperty rdf:resource="http://example.org/test#name"/>
      </owl:Restriction>
    </rdfs:subClassOf>
  </owl:Class>
</rdf:RDF>
"#;

    #[test]
    fn test_parse_rdfxml() {
        let triples = RdfXmlParserWrapper::parse(ONTOLOGY, None).unwrap();
        assert_eq!(triples.len(), 5);
        let label = triples
            .iter()
            .find_map(|t| match &t.object {
                RdfObject::Literal(l) => Some(l.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(label.value(), "Person");
        assert_eq!(label.language(), Some("en"));
    }

    #[test]
    fn test_declared_prefixes() {
        let prefixes = declared_prefixes(ONTOLOGY);
        assert_eq!(prefixes.len(), 4);
        assert_eq!(prefixes["ex"], "http://example.org/test#");
    }

    #[test]
    fn test_malformed_rdfxml() {
        assert!(RdfXmlParserWrapper::parse("<rdf:RDF xmlns:rdf=\"x\"><unclosed>", None).is_err());
    }
}
