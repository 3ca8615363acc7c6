//! Store-wide identifier index
//!
//! Built by one pass over every record in sorted path order. The first file
//! seen for an identifier wins; a later file with the same identifier and the
//! same content is a harmless duplicate (namespace records are written into
//! every importing directory), one with different content is a collision.

use super::{RecordData, RecordKind, RecordStore, StoreError, StoreResult};
use crate::identity::Identifier;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What the index knows about one identifier
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub kind: RecordKind,
    pub uri: Option<String>,
    pub path: PathBuf,
    pub prefix: String,
    data: RecordData,
}

/// Two files claiming one identifier with different content
#[derive(Debug, Clone)]
pub struct Collision {
    pub id: Identifier,
    pub first: PathBuf,
    pub second: PathBuf,
}

/// Identifier → record index
#[derive(Debug, Default)]
pub struct RecordIndex {
    entries: HashMap<Identifier, IndexEntry>,
    by_uri: HashMap<String, Identifier>,
    collisions: Vec<Collision>,
    unreadable: Vec<(PathBuf, String)>,
}

impl RecordIndex {
    /// Index every record in the store
    ///
    /// Files whose name is not an identifier are not indexed. Unparseable
    /// files are remembered, not fatal.
    pub fn build(store: &RecordStore) -> StoreResult<Self> {
        let mut index = Self::default();
        for item in store.list_records(None, None) {
            let stored = match item {
                Ok(stored) => stored,
                Err(StoreError::Record { path, source }) => {
                    index.unreadable.push((path, source.to_string()));
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(id) = stored.file_identifier() else {
                continue;
            };
            let data = stored.record.data.normalized();
            if let Some(existing) = index.entries.get(&id) {
                if existing.data != data {
                    warn!(
                        "Identifier {} claimed by {} and {}",
                        id,
                        existing.path.display(),
                        stored.path.display()
                    );
                    index.collisions.push(Collision {
                        id,
                        first: existing.path.clone(),
                        second: stored.path.clone(),
                    });
                }
                continue;
            }
            let uri = stored.record.uri().map(str::to_string);
            if let Some(uri) = &uri {
                index.by_uri.entry(uri.clone()).or_insert(id);
            }
            index.entries.insert(
                id,
                IndexEntry {
                    kind: stored.record.kind(),
                    uri,
                    path: stored.path,
                    prefix: stored.prefix,
                    data,
                },
            );
        }
        debug!(
            "Indexed {} records ({} collisions, {} unreadable)",
            index.entries.len(),
            index.collisions.len(),
            index.unreadable.len()
        );
        Ok(index)
    }

    pub fn get(&self, id: &Identifier) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(id)
    }

    /// Identifier of the record carrying this URI
    pub fn id_for_uri(&self, uri: &str) -> Option<Identifier> {
        self.by_uri.get(uri).copied()
    }

    /// URI of a namespace, anchor or blank node record
    pub fn uri_of(&self, id: &Identifier) -> Option<&str> {
        self.entries.get(id).and_then(|e| e.uri.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Files that failed to parse, with the reason
    pub fn unreadable(&self) -> &[(PathBuf, String)] {
        &self.unreadable
    }
}
