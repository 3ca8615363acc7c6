//! Turtle family implementation (Turtle, N3, TriG, N-Triples, N-Quads)

use crate::rdf::{
    BlankNode, Literal, NamedNode, RdfObject, RdfPredicate, RdfSubject, Triple, XSD_STRING,
};
use super::{ParseError, ParseResult, RdfFormat, SerializeError, SerializeResult};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use oxiri::Iri;
use regex::Regex;
use rio_api::formatter::TriplesFormatter;
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{
    NQuadsParser, NTriplesFormatter, NTriplesParser, TriGParser, TurtleError, TurtleFormatter,
    TurtleParser,
};
use std::io;

static PREFIX_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*@?prefix\s+([A-Za-z0-9_.\-]*):\s*<([^>]*)>")
        .expect("valid prefix declaration pattern")
});

/// `@prefix` / `PREFIX` declarations in document order
pub(super) fn declared_prefixes(input: &str) -> IndexMap<String, String> {
    PREFIX_DECL
        .captures_iter(input)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

fn invalid(e: impl ToString) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// Turtle parser
pub struct TurtleParserWrapper;

impl TurtleParserWrapper {
    /// Parse Turtle (or N3 restricted to Turtle) string to Triples
    pub fn parse(input: &str, base: Option<Iri<String>>, format: RdfFormat) -> ParseResult<Vec<Triple>> {
        let mut parser = TurtleParser::new(input.as_bytes(), base);
        let mut triples = Vec::new();

        let res: Result<(), TurtleError> = parser.parse_all(&mut |t| {
            triples.push(convert_triple(t.subject, t.predicate, t.object)?);
            Ok(())
        });

        res.map(|_| triples).map_err(|e| ParseError::syntax(format, e))
    }

    /// Parse N-Triples
    pub fn parse_ntriples(input: &str) -> ParseResult<Vec<Triple>> {
        let mut parser = NTriplesParser::new(input.as_bytes());
        let mut triples = Vec::new();

        let res: Result<(), TurtleError> = parser.parse_all(&mut |t| {
            triples.push(convert_triple(t.subject, t.predicate, t.object)?);
            Ok(())
        });

        res.map(|_| triples)
            .map_err(|e| ParseError::syntax(RdfFormat::NTriples, e))
    }

    /// Parse TriG, merging all graphs into one triple set
    pub fn parse_trig(input: &str, base: Option<Iri<String>>) -> ParseResult<Vec<Triple>> {
        let mut parser = TriGParser::new(input.as_bytes(), base);
        let mut triples = Vec::new();

        let res: Result<(), TurtleError> = parser.parse_all(&mut |q| {
            triples.push(convert_triple(q.subject, q.predicate, q.object)?);
            Ok(())
        });

        res.map(|_| triples).map_err(|e| ParseError::syntax(RdfFormat::TriG, e))
    }

    /// Parse N-Quads, merging all graphs into one triple set
    pub fn parse_nquads(input: &str) -> ParseResult<Vec<Triple>> {
        let mut parser = NQuadsParser::new(input.as_bytes());
        let mut triples = Vec::new();

        let res: Result<(), TurtleError> = parser.parse_all(&mut |q| {
            triples.push(convert_triple(q.subject, q.predicate, q.object)?);
            Ok(())
        });

        res.map(|_| triples)
            .map_err(|e| ParseError::syntax(RdfFormat::NQuads, e))
    }
}

/// Turtle and N-Triples serializer
pub struct TurtleSerializerWrapper;

impl TurtleSerializerWrapper {
    /// Serialize Triples to Turtle string
    pub fn serialize(triples: &[Triple]) -> SerializeResult<String> {
        let mut output = Vec::new();
        let mut formatter = TurtleFormatter::new(&mut output);

        for triple in triples {
            with_rio_triple(triple, |t| formatter.format(t))
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }

        formatter
            .finish()
            .map_err(|e| SerializeError::Serialize(e.to_string()))?;

        String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
    }

    /// Serialize Triples to N-Triples string, one statement per line
    pub fn serialize_ntriples(triples: &[Triple]) -> SerializeResult<String> {
        let mut output = Vec::new();
        {
            let mut formatter = NTriplesFormatter::new(&mut output);
            for triple in triples {
                with_rio_triple(triple, |t| formatter.format(t))
                    .map_err(|e| SerializeError::Serialize(e.to_string()))?;
            }
        }
        String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
    }
}

/// Borrow a triple as its rio model counterpart
fn with_rio_triple<R>(triple: &Triple, f: impl FnOnce(&rio_api::model::Triple<'_>) -> R) -> R {
    let subject = match &triple.subject {
        RdfSubject::NamedNode(n) => {
            rio_api::model::Subject::NamedNode(rio_api::model::NamedNode { iri: n.as_str() })
        }
        RdfSubject::BlankNode(b) => {
            rio_api::model::Subject::BlankNode(rio_api::model::BlankNode { id: b.as_str() })
        }
    };

    let predicate = rio_api::model::NamedNode {
        iri: triple.predicate.as_str(),
    };

    let datatype = match &triple.object {
        RdfObject::Literal(l) if l.language().is_none() => Some(l.datatype()),
        _ => None,
    };
    let object = match &triple.object {
        RdfObject::NamedNode(n) => {
            rio_api::model::Term::NamedNode(rio_api::model::NamedNode { iri: n.as_str() })
        }
        RdfObject::BlankNode(b) => {
            rio_api::model::Term::BlankNode(rio_api::model::BlankNode { id: b.as_str() })
        }
        RdfObject::Literal(l) => match (l.language(), &datatype) {
            (Some(language), _) => {
                rio_api::model::Term::Literal(rio_api::model::Literal::LanguageTaggedString {
                    value: l.value(),
                    language,
                })
            }
            (None, Some(dt)) if dt.as_str() != XSD_STRING => {
                rio_api::model::Term::Literal(rio_api::model::Literal::Typed {
                    value: l.value(),
                    datatype: rio_api::model::NamedNode { iri: dt.as_str() },
                })
            }
            _ => rio_api::model::Term::Literal(rio_api::model::Literal::Simple { value: l.value() }),
        },
    };

    f(&rio_api::model::Triple {
        subject,
        predicate,
        object,
    })
}

fn convert_triple(
    s: rio_api::model::Subject,
    p: rio_api::model::NamedNode,
    o: rio_api::model::Term,
) -> Result<Triple, io::Error> {
    Ok(Triple::new(
        convert_subject(s)?,
        RdfPredicate::new(p.iri).map_err(invalid)?,
        convert_object(o)?,
    ))
}

pub(super) fn convert_subject(s: rio_api::model::Subject) -> Result<RdfSubject, io::Error> {
    match s {
        rio_api::model::Subject::NamedNode(n) => {
            Ok(RdfSubject::NamedNode(NamedNode::new(n.iri).map_err(invalid)?))
        }
        rio_api::model::Subject::BlankNode(b) => {
            Ok(RdfSubject::BlankNode(BlankNode::new(b.id).map_err(invalid)?))
        }
        _ => Err(invalid("Unsupported subject type (RDF-star)")),
    }
}

pub(super) fn convert_object(o: rio_api::model::Term) -> Result<RdfObject, io::Error> {
    match o {
        rio_api::model::Term::NamedNode(n) => {
            Ok(RdfObject::NamedNode(NamedNode::new(n.iri).map_err(invalid)?))
        }
        rio_api::model::Term::BlankNode(b) => {
            Ok(RdfObject::BlankNode(BlankNode::new(b.id).map_err(invalid)?))
        }
        rio_api::model::Term::Literal(l) => match l {
            rio_api::model::Literal::Simple { value } => {
                Ok(RdfObject::Literal(Literal::new_simple_literal(value)))
            }
            rio_api::model::Literal::LanguageTaggedString { value, language } => Ok(
                RdfObject::Literal(Literal::new_language_tagged_literal(value, language).map_err(invalid)?),
            ),
            rio_api::model::Literal::Typed { value, datatype } => {
                let dt = NamedNode::new(datatype.iri).map_err(invalid)?;
                Ok(RdfObject::Literal(Literal::new_typed_literal(value, dt)))
            }
        },
        _ => Err(invalid("Unsupported object type (RDF-star)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r#"
@prefix ex: <http://example.org/test#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

ex:Person a owl:Class ;
    rdfs:label "Person"@en ;
    rdfs:subClassOf [ a owl:Restriction ; owl:onProperty ex:name ] .
"#;

    #[test]
    fn test_parse_turtle() {
        let triples = TurtleParserWrapper::parse(PERSON, None, RdfFormat::Turtle).unwrap();
        assert_eq!(triples.len(), 5);
        assert_eq!(triples.iter().filter(|t| t.subject.is_blank_node()).count(), 2);

        let prefixes = declared_prefixes(PERSON);
        assert_eq!(prefixes.get("ex").map(String::as_str), Some("http://example.org/test#"));
        assert_eq!(prefixes.keys().next().map(String::as_str), Some("ex"));
    }

    #[test]
    fn test_parse_quads_drops_graph_names() {
        let input = "<http://e/a> <http://e/p> \"x\" <http://e/g> .\n<http://e/a> <http://e/p> \"y\" .\n";
        let triples = TurtleParserWrapper::parse_nquads(input).unwrap();
        assert_eq!(triples.len(), 2);
    }

    #[test]
    fn test_ntriples_round_trip() {
        let input = "<http://e/a> <http://e/p> \"line\\nbreak\"@en .\n<http://e/a> <http://e/q> _:b0 .\n<http://e/a> <http://e/r> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n";
        let triples = TurtleParserWrapper::parse_ntriples(input).unwrap();
        let output = TurtleSerializerWrapper::serialize_ntriples(&triples).unwrap();
        let reparsed = TurtleParserWrapper::parse_ntriples(&output).unwrap();
        assert_eq!(triples, reparsed);
    }

    #[test]
    fn test_turtle_serialize() {
        let input = r#"<http://example.org/a> <http://example.org/b> "c" ."#;
        let triples = TurtleParserWrapper::parse(input, None, RdfFormat::Turtle).unwrap();
        let output = TurtleSerializerWrapper::serialize(&triples).unwrap();
        assert!(output.contains("http://example.org/a"));
        let reparsed = TurtleParserWrapper::parse(&output, None, RdfFormat::Turtle).unwrap();
        assert_eq!(triples, reparsed);
    }
}
