//! Export: records → RDF triples

use super::{item_error, ItemError};
use crate::rdf::{
    BlankNode, NamedNode, PrefixRegistry, RdfFormat, RdfObject, RdfPredicate, RdfSerializer, RdfSubject,
    SerializeError, Triple,
};
use crate::record::{RecordData, RecordIndex, RecordKind, RecordStore, StatementObject, StoreError};
use crate::reference::Reference;
use crate::resolve::{ResolveError, ResolveResult, Resolver};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Fatal export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// No directory for the prefix
    #[error("Nothing stored under prefix '{0}'")]
    UnknownPrefix(String),

    /// Store not readable
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Output could not be produced
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Export statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportStats {
    pub prefix: String,
    pub statements: usize,
    pub triples: usize,
    /// Statements that could not be turned back into triples
    pub errors: Vec<ItemError>,
}

/// Triples rebuilt from one namespace directory
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    /// Sorted and free of duplicates
    pub triples: Vec<Triple>,
    pub stats: ExportStats,
}

enum Node {
    Named(NamedNode),
    Blank(BlankNode),
}

/// Blank node records come back as `b{identifier}` labels
fn node(resolver: &Resolver<'_>, reference: &Reference) -> ResolveResult<Node> {
    let target = resolver.from_reference(reference)?;
    if resolver.is_blank_node(&target) {
        let label = format!("b{}", target.identifier().simple());
        return Ok(Node::Blank(BlankNode::new_unchecked(label)));
    }
    let uri = target
        .uri()
        .ok_or(ResolveError::MissingUri(target.identifier()))?;
    NamedNode::new(uri)
        .map(Node::Named)
        .map_err(|_| ResolveError::InvalidIri(uri.to_string()))
}

fn statement_triple(
    resolver: &Resolver<'_>,
    subject: &Reference,
    predicate: &Reference,
    object: &StatementObject,
) -> Result<Triple, (&'static str, ResolveError)> {
    let subject = match node(resolver, subject).map_err(|e| ("subject", e))? {
        Node::Named(n) => RdfSubject::NamedNode(n),
        Node::Blank(b) => RdfSubject::BlankNode(b),
    };
    let predicate_uri = resolver
        .resolve_uri(predicate)
        .map_err(|e| ("predicate", e))?;
    let predicate = NamedNode::new(&predicate_uri)
        .map(RdfPredicate::from)
        .map_err(|_| ("predicate", ResolveError::InvalidIri(predicate_uri.clone())))?;
    let object = match object {
        StatementObject::Reference(r) => match node(resolver, r).map_err(|e| ("object", e))? {
            Node::Named(n) => RdfObject::NamedNode(n),
            Node::Blank(b) => RdfObject::BlankNode(b),
        },
        StatementObject::Literal(value) => {
            RdfObject::Literal(resolver.rdf_literal(value).map_err(|e| ("object", e))?)
        }
    };
    Ok(Triple::new(subject, predicate, object))
}

/// Rebuild the triples stored under `prefix`
///
/// References resolve against the whole store. A statement that does not
/// resolve is reported in the stats and left out; the rest still export.
pub fn export(store: &RecordStore, registry: &PrefixRegistry, prefix: &str) -> Result<ExportResult, ExportError> {
    if !store.namespace_dir(prefix).is_dir() {
        return Err(ExportError::UnknownPrefix(prefix.to_string()));
    }
    let index = RecordIndex::build(store)?;
    let resolver = Resolver::new(registry, &index);

    let mut stats = ExportStats {
        prefix: prefix.to_string(),
        ..Default::default()
    };
    let mut triples = Vec::new();
    for item in store.list_records(Some(prefix), Some(RecordKind::Statement)) {
        let stored = match item {
            Ok(stored) => stored,
            Err(e) => {
                stats.errors.push(item_error(prefix, e)?);
                continue;
            }
        };
        let RecordData::Statement {
            subject,
            predicate,
            object,
        } = &stored.record.data
        else {
            continue;
        };
        stats.statements += 1;
        match statement_triple(&resolver, subject, predicate, object) {
            Ok(triple) => triples.push(triple),
            Err((field, e)) => stats.errors.push(ItemError::new(
                format!("{}:{}", stored.path.display(), field),
                e,
            )),
        }
    }

    triples.sort();
    triples.dedup();
    stats.triples = triples.len();
    info!(
        "Exported '{}': {} triples from {} statements, {} errors",
        prefix,
        stats.triples,
        stats.statements,
        stats.errors.len()
    );
    Ok(ExportResult { triples, stats })
}

/// Export and serialize in one step
pub fn export_to_string(
    store: &RecordStore,
    registry: &PrefixRegistry,
    prefix: &str,
    format: RdfFormat,
) -> Result<(String, ExportStats), ExportError> {
    let result = export(store, registry, prefix)?;
    let output = RdfSerializer::serialize(&result.triples, format)?;
    Ok((output, result.stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{identifier_for, statement_identifier};
    use crate::literal::LiteralValue;
    use crate::record::Record;
    use crate::rdf::RDF_TYPE;
    use tempfile::TempDir;

    const NS: &str = "http://example.org/test#";

    fn store_with_person() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let person = format!("{}Person", NS);
        store.save("ex", &identifier_for(NS), &Record::namespace(NS)).unwrap();
        store
            .save("ex", &identifier_for(&person), &Record::anchor(person.clone()))
            .unwrap();
        let owl_class = "http://www.w3.org/2002/07/owl#Class";
        store
            .save(
                "ex",
                &statement_identifier(&person, RDF_TYPE, owl_class),
                &Record::statement(
                    Reference::wikilink(identifier_for(&person)),
                    Reference::aliased(identifier_for(RDF_TYPE), "a"),
                    StatementObject::Reference(Reference::external(owl_class)),
                ),
            )
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_export_resolves_references() {
        let (_dir, store) = store_with_person();
        let registry = PrefixRegistry::with_defaults();
        let result = export(&store, &registry, "ex").unwrap();

        assert_eq!(result.triples.len(), 1);
        assert!(result.stats.errors.is_empty());
        assert_eq!(
            result.triples[0].to_string(),
            "<http://example.org/test#Person> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2002/07/owl#Class> ."
        );
    }

    #[test]
    fn test_unresolved_statement_is_reported() {
        let (_dir, store) = store_with_person();
        let missing = identifier_for(&format!("{}Missing", NS));
        store
            .save(
                "ex",
                &identifier_for("broken statement"),
                &Record::statement(
                    Reference::wikilink(missing),
                    Reference::external("http://www.w3.org/2000/01/rdf-schema#label"),
                    StatementObject::Literal(LiteralValue::tagged("Missing", "en")),
                ),
            )
            .unwrap();
        let registry = PrefixRegistry::with_defaults();
        let result = export(&store, &registry, "ex").unwrap();

        assert_eq!(result.stats.statements, 2);
        assert_eq!(result.triples.len(), 1);
        assert_eq!(result.stats.errors.len(), 1);
        assert!(result.stats.errors[0].location.ends_with(":subject"));
    }

    #[test]
    fn test_unknown_prefix() {
        let (_dir, store) = store_with_person();
        let registry = PrefixRegistry::with_defaults();
        assert!(matches!(
            export(&store, &registry, "nope"),
            Err(ExportError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_export_to_ntriples() {
        let (_dir, store) = store_with_person();
        let registry = PrefixRegistry::with_defaults();
        let (output, stats) = export_to_string(&store, &registry, "ex", RdfFormat::NTriples).unwrap();
        assert_eq!(stats.triples, 1);
        assert!(output.contains("<http://example.org/test#Person>"));
    }
}
