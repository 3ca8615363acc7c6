//! JSON-LD format implementation
//!
//! Expansion and RDF conversion are done by `sophia_jsonld`. Remote
//! contexts are not fetched; a document that needs one fails to parse.

use super::{ParseError, ParseResult, RdfFormat};
use crate::rdf::{BlankNode, Literal, NamedNode, RdfObject, RdfPredicate, RdfSubject, Triple};
use indexmap::IndexMap;
use serde_json::Value;
use sophia_api::parser::QuadParser;
use sophia_api::quad::Quad;
use sophia_api::source::QuadSource;
use sophia_api::term::{Term, TermKind};
use sophia_jsonld::JsonLdParser;

fn error(message: impl Into<String>) -> ParseError {
    ParseError::syntax(RdfFormat::JsonLd, message.into())
}

fn named<T: Term>(term: &T) -> ParseResult<NamedNode> {
    let iri = term.iri().ok_or_else(|| error("expected an IRI"))?;
    NamedNode::new(iri.as_str()).map_err(|e| error(e.to_string()))
}

fn blank<T: Term>(term: &T) -> ParseResult<BlankNode> {
    let id = term.bnode_id().ok_or_else(|| error("expected a blank node"))?;
    BlankNode::new(id.as_str()).map_err(|e| error(e.to_string()))
}

fn subject<T: Term>(term: &T) -> ParseResult<RdfSubject> {
    match term.kind() {
        TermKind::Iri => named(term).map(Into::into),
        TermKind::BlankNode => blank(term).map(Into::into),
        _ => Err(error("subject must be an IRI or a blank node")),
    }
}

fn object<T: Term>(term: &T) -> ParseResult<RdfObject> {
    match term.kind() {
        TermKind::Iri => named(term).map(Into::into),
        TermKind::BlankNode => blank(term).map(Into::into),
        TermKind::Literal => {
            let text = term
                .lexical_form()
                .ok_or_else(|| error("literal without a lexical form"))?
                .to_string();
            let literal = match (term.language_tag(), term.datatype()) {
                (Some(tag), _) => Literal::new_language_tagged_literal(text, tag.as_str())
                    .map_err(|e| error(e.to_string()))?,
                (None, Some(dt)) => Literal::new_typed_literal(
                    text,
                    NamedNode::new(dt.as_str()).map_err(|e| error(e.to_string()))?,
                ),
                (None, None) => Literal::new_simple_literal(text),
            };
            Ok(literal.into())
        }
        _ => Err(error("unsupported term in object position")),
    }
}

/// Graph name dropped
fn triple<Q: Quad>(quad: &Q) -> ParseResult<Triple> {
    Ok(Triple::new(
        subject(&quad.s())?,
        RdfPredicate::from(named(&quad.p())?),
        object(&quad.o())?,
    ))
}

/// Top-level `@context` entries that map a prefix to a namespace-like IRI
fn context_prefixes(document: &Value) -> IndexMap<String, String> {
    let mut prefixes = IndexMap::new();
    let tops: Vec<&Value> = match document {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for top in tops {
        let contexts: Vec<&Value> = match top.get("@context") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => continue,
        };
        for context in contexts {
            let Value::Object(map) = context else { continue };
            for (key, def) in map {
                if let Value::String(iri) = def {
                    if !key.starts_with('@') && (iri.ends_with('#') || iri.ends_with('/')) {
                        prefixes.entry(key.clone()).or_insert_with(|| iri.clone());
                    }
                }
            }
        }
    }
    prefixes
}

/// JSON-LD parser
pub struct JsonLdParserWrapper;

impl JsonLdParserWrapper {
    /// Parse JSON-LD string to Triples plus the namespace-like context
    /// entries. Named graphs are flattened into one triple set.
    pub fn parse(input: &str) -> ParseResult<(Vec<Triple>, IndexMap<String, String>)> {
        let document: Value = serde_json::from_str(input).map_err(|e| error(e.to_string()))?;

        let parser = JsonLdParser::new();
        let mut converted: Vec<ParseResult<Triple>> = Vec::new();
        parser
            .parse_str(input)
            .for_each_quad(|quad| converted.push(triple(&quad)))
            .map_err(|e| error(e.to_string()))?;

        let triples = converted.into_iter().collect::<ParseResult<Vec<Triple>>>()?;
        Ok((triples, context_prefixes(&document)))
    }
}
