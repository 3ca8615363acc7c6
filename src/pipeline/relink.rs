//! Relink: upgrade external references once their records exist
//!
//! An import writes `<uri>` for every resource the store does not know yet.
//! After the vocabulary behind such a URI has been imported, relink turns
//! the reference into a `[[identifier]]` wikilink. Identifiers are computed
//! from URIs, so a relinked statement keeps its file name; the pass checks
//! that anyway.

use super::{item_error, ItemError};
use crate::identity::identifier_for;
use crate::literal::LiteralValue;
use crate::rdf::{PrefixRegistry, RDF_TYPE};
use crate::record::{Record, RecordData, RecordIndex, RecordKind, RecordStore, StatementObject, StoreResult};
use crate::reference::Reference;
use crate::resolve::Resolver;
use serde::Serialize;
use tracing::{debug, info};

/// Relink statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelinkStats {
    pub statements: usize,
    /// Records written back
    pub rewritten: usize,
    /// External references turned into wikilinks
    pub references_linked: usize,
    pub aliases_updated: usize,
    /// Statements whose file name is not their canonical identifier
    pub identifier_mismatches: usize,
    pub errors: Vec<ItemError>,
}

struct Linker<'a> {
    index: &'a RecordIndex,
    resolver: &'a Resolver<'a>,
    linked: usize,
}

impl Linker<'_> {
    fn link(&mut self, reference: &Reference) -> Reference {
        if let Reference::External(uri) = reference {
            let id = identifier_for(uri);
            if self.index.contains(&id) {
                self.linked += 1;
                return Reference::wikilink(id);
            }
        }
        reference.clone()
    }

    fn link_predicate(&mut self, reference: &Reference) -> Reference {
        match self.resolver.resolve_uri(reference) {
            Ok(uri) if uri == RDF_TYPE => self.resolver.predicate_reference(RDF_TYPE),
            _ => self.link(reference),
        }
    }

    fn link_object(&mut self, object: &StatementObject) -> StatementObject {
        match object {
            StatementObject::Reference(r) => StatementObject::Reference(self.link(r)),
            StatementObject::Literal(value) => StatementObject::Literal(LiteralValue {
                datatype: value.datatype.as_ref().map(|dt| self.link(dt)),
                ..value.clone()
            }),
        }
    }
}

/// Relink statements in one namespace directory, or in the whole store
pub fn relink(store: &RecordStore, registry: &PrefixRegistry, prefix: Option<&str>) -> StoreResult<RelinkStats> {
    let index = RecordIndex::build(store)?;
    let resolver = Resolver::new(registry, &index);
    let mut linker = Linker {
        index: &index,
        resolver: &resolver,
        linked: 0,
    };
    let mut stats = RelinkStats::default();

    for item in store.list_records(prefix, Some(RecordKind::Statement)) {
        let stored = match item {
            Ok(stored) => stored,
            Err(e) => {
                stats.errors.push(item_error(prefix.unwrap_or("store"), e)?);
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
        let Some(id) = stored.file_identifier() else {
            stats.errors.push(ItemError::new(
                stored.path.display().to_string(),
                "file name is not an identifier",
            ));
            continue;
        };

        let linked_before = linker.linked;
        let subject = linker.link(subject);
        let predicate = linker.link_predicate(predicate);
        let object = linker.link_object(object);

        match resolver.statement_identifier(&subject, &predicate, &object) {
            Ok(expected) if expected != id => {
                stats.identifier_mismatches += 1;
                stats.errors.push(ItemError::new(
                    stored.path.display().to_string(),
                    format!("canonical identifier is {}", expected),
                ));
            }
            _ => {}
        }

        let mut updated = Record {
            data: RecordData::Statement {
                subject,
                predicate,
                object,
            },
            ..stored.record.clone()
        };
        if let RecordData::Statement {
            subject,
            predicate,
            object,
        } = &updated.data
        {
            if let Ok(alias) = resolver.alias_for(subject, predicate, object) {
                if updated.aliases.first() != Some(&alias) {
                    if updated.aliases.is_empty() {
                        updated.aliases.push(alias);
                    } else {
                        updated.aliases[0] = alias;
                    }
                    stats.aliases_updated += 1;
                }
            }
        }

        if updated != stored.record {
            store.replace(&stored.prefix, &id, &updated)?;
            stats.rewritten += 1;
            debug!(
                "Relinked {} ({} references)",
                stored.path.display(),
                linker.linked - linked_before
            );
        }
    }

    stats.references_linked = linker.linked;
    info!(
        "Relinked {} of {} statements: {} references linked, {} aliases updated, {} identifier mismatches",
        stats.rewritten,
        stats.statements,
        stats.references_linked,
        stats.aliases_updated,
        stats.identifier_mismatches
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::statement_identifier;
    use crate::record::StoredRecord;
    use tempfile::TempDir;

    const PERSON: &str = "http://example.org/test#Person";
    const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";

    fn type_statement() -> (crate::identity::Identifier, Record) {
        let record = Record::statement(
            Reference::wikilink(identifier_for(PERSON)),
            Reference::aliased(identifier_for(RDF_TYPE), "a"),
            StatementObject::Reference(Reference::external(OWL_CLASS)),
        );
        (statement_identifier(PERSON, RDF_TYPE, OWL_CLASS), record)
    }

    fn load(store: &RecordStore, id: &crate::identity::Identifier) -> StoredRecord {
        store.load(id).unwrap()
    }

    #[test]
    fn test_external_becomes_wikilink() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let registry = PrefixRegistry::with_defaults();
        store.save("ex", &identifier_for(PERSON), &Record::anchor(PERSON)).unwrap();
        let (id, record) = type_statement();
        store.save("ex", &id, &record).unwrap();

        // nothing to link yet, only the alias is filled in
        let stats = relink(&store, &registry, Some("ex")).unwrap();
        assert_eq!(stats.references_linked, 0);
        assert_eq!(stats.aliases_updated, 1);
        assert_eq!(load(&store, &id).record.aliases, vec!["ex:Person a owl:Class".to_string()]);

        store.save("owl", &identifier_for(OWL_CLASS), &Record::anchor(OWL_CLASS)).unwrap();
        let stats = relink(&store, &registry, Some("ex")).unwrap();
        assert_eq!(stats.references_linked, 1);
        assert_eq!(stats.rewritten, 1);
        assert_eq!(stats.identifier_mismatches, 0);

        let relinked = load(&store, &id);
        match &relinked.record.data {
            RecordData::Statement { object, .. } => assert_eq!(
                object,
                &StatementObject::Reference(Reference::wikilink(identifier_for(OWL_CLASS)))
            ),
            other => panic!("unexpected record {:?}", other),
        }
        assert!(relinked.record.same_content(&record));

        // second pass is a no-op
        let stats = relink(&store, &registry, Some("ex")).unwrap();
        assert_eq!(stats.rewritten, 0);
    }

    #[test]
    fn test_mismatched_identifier_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let registry = PrefixRegistry::with_defaults();
        store.save("ex", &identifier_for(PERSON), &Record::anchor(PERSON)).unwrap();
        let (_, record) = type_statement();
        store.save("ex", &identifier_for("misnamed"), &record).unwrap();

        let stats = relink(&store, &registry, None).unwrap();
        assert_eq!(stats.identifier_mismatches, 1);
        assert_eq!(stats.errors.len(), 1);
    }
}
