//! Directory-backed record store
//!
//! Layout: `<root>/<prefix>/<identifier>.md`, one directory per imported
//! ontology, plus `<root>/_prefixes.yaml`.
//!
//! The store assumes a single writer. Writes are first-writer-wins: saving
//! over an existing file is a no-op when the content agrees and a collision
//! error when it does not.

use super::{Record, RecordError, RecordKind};
use crate::identity::Identifier;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Record file extension
pub const RECORD_EXTENSION: &str = "md";

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Record file that does not parse
    #[error("{}: {source}", .path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    /// Existing file with the same identifier holds different content
    #[error("Identifier collision for {id} at {}: existing record differs", .path.display())]
    Collision { id: Identifier, path: PathBuf },

    /// No record with this identifier
    #[error("Record not found: {0}")]
    NotFound(Identifier),

    /// Prefix unusable as a directory name
    #[error("Invalid namespace prefix '{0}'")]
    InvalidPrefix(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// File written
    Created,
    /// Identical record already present, nothing written
    Unchanged,
}

/// A record together with where it was found
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// File path
    pub path: PathBuf,
    /// Namespace directory the file lives in
    pub prefix: String,
    /// File name without extension
    pub stem: String,
    pub record: Record,
}

impl StoredRecord {
    /// Identifier named by the file, if the name is one
    pub fn file_identifier(&self) -> Option<Identifier> {
        Identifier::parse(&self.stem).ok()
    }
}

/// Directory-backed record store
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

fn valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && !prefix.starts_with(['.', '_'])
        && !prefix.contains(['/', '\\'])
}

impl RecordStore {
    /// Open or create a store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("Opened record store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a namespace's records
    pub fn namespace_dir(&self, prefix: &str) -> PathBuf {
        self.root.join(prefix)
    }

    /// Path of a record file
    pub fn record_path(&self, prefix: &str, id: &Identifier) -> PathBuf {
        self.namespace_dir(prefix)
            .join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    /// Save a record under its identifier, first writer wins
    pub fn save(&self, prefix: &str, id: &Identifier, record: &Record) -> StoreResult<SaveOutcome> {
        let path = self.record_path(prefix, id);
        if path.exists() {
            let existing = self.load_path(&path)?;
            if existing.record.same_content(record) {
                return Ok(SaveOutcome::Unchanged);
            }
            return Err(StoreError::Collision { id: *id, path });
        }
        self.write(prefix, &path, record)?;
        debug!("Wrote {} record {}", record.kind(), path.display());
        Ok(SaveOutcome::Created)
    }

    /// Overwrite a record unconditionally
    pub fn replace(&self, prefix: &str, id: &Identifier, record: &Record) -> StoreResult<()> {
        let path = self.record_path(prefix, id);
        self.write(prefix, &path, record)?;
        debug!("Rewrote {} record {}", record.kind(), path.display());
        Ok(())
    }

    fn write(&self, prefix: &str, path: &Path, record: &Record) -> StoreResult<()> {
        if !valid_prefix(prefix) {
            return Err(StoreError::InvalidPrefix(prefix.to_string()));
        }
        let text = record.render().map_err(|source| StoreError::Record {
            path: path.to_path_buf(),
            source,
        })?;
        fs::create_dir_all(self.namespace_dir(prefix))?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Read and parse one record file
    pub fn load_path(&self, path: &Path) -> StoreResult<StoredRecord> {
        let text = fs::read_to_string(path)?;
        let record = Record::parse(&text).map_err(|source| StoreError::Record {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(StoredRecord {
            path: path.to_path_buf(),
            prefix,
            stem,
            record,
        })
    }

    /// Load a record by identifier from any namespace directory
    pub fn load(&self, id: &Identifier) -> StoreResult<StoredRecord> {
        for prefix in self.prefixes()? {
            let path = self.record_path(&prefix, id);
            if path.is_file() {
                return self.load_path(&path);
            }
        }
        Err(StoreError::NotFound(*id))
    }

    /// Namespace directories present in the store, sorted
    pub fn prefixes(&self) -> StoreResult<Vec<String>> {
        let mut prefixes = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if valid_prefix(&name) {
                prefixes.push(name);
            }
        }
        prefixes.sort();
        Ok(prefixes)
    }

    /// Lazily enumerate records, optionally limited to one namespace and
    /// one kind
    ///
    /// Files are visited in sorted path order. Unparseable files are yielded
    /// as errors regardless of the kind filter. Each call starts a fresh
    /// traversal of the files present at that time.
    pub fn list_records(&self, prefix: Option<&str>, kind: Option<RecordKind>) -> RecordIter {
        let (start, depth) = match prefix {
            Some(prefix) => (self.namespace_dir(prefix), 1),
            None => (self.root.clone(), 2),
        };
        let walker = WalkDir::new(start)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter();
        RecordIter {
            store: self.clone(),
            walker,
            kind,
        }
    }

    /// Delete every record file of a namespace, returning how many were removed
    pub fn clear_namespace(&self, prefix: &str) -> StoreResult<usize> {
        if !valid_prefix(prefix) {
            return Err(StoreError::InvalidPrefix(prefix.to_string()));
        }
        let dir = self.namespace_dir(prefix);
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == RECORD_EXTENSION) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!("Removed {} records from {}", removed, dir.display());
        Ok(removed)
    }
}

/// Lazy record iterator returned by [`RecordStore::list_records`]
pub struct RecordIter {
    store: RecordStore,
    walker: walkdir::IntoIter,
    kind: Option<RecordKind>,
}

impl Iterator for RecordIter {
    type Item = StoreResult<StoredRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                // a namespace directory that does not exist is simply empty
                Err(e) if e.io_error().is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) => {
                    return None
                }
                Err(e) => return Some(Err(e.into())),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().map_or(true, |e| e != RECORD_EXTENSION) {
                continue;
            }
            let in_namespace = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| valid_prefix(&n.to_string_lossy()))
                .unwrap_or(false);
            if !in_namespace {
                continue;
            }
            match self.store.load_path(path) {
                Ok(stored) => {
                    if self.kind.map_or(true, |k| stored.record.kind() == k) {
                        return Some(Ok(stored));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::identifier_for;
    use tempfile::TempDir;

    fn store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_load() {
        let (_dir, store) = store();
        let uri = "http://example.org/test#Person";
        let id = identifier_for(uri);
        let record = Record::anchor(uri).with_alias("ex:Person");

        assert_eq!(store.save("ex", &id, &record).unwrap(), SaveOutcome::Created);
        let path = store.record_path("ex", &id);
        assert!(path.ends_with(format!("ex/{}.md", id)));

        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.record, record);
        assert_eq!(loaded.prefix, "ex");
        assert_eq!(loaded.file_identifier(), Some(id));
    }

    #[test]
    fn test_first_writer_wins() {
        let (_dir, store) = store();
        let id = identifier_for("http://example.org/test#Person");
        let first = Record::anchor("http://example.org/test#Person").with_alias("ex:Person");
        store.save("ex", &id, &first).unwrap();

        let same = Record::anchor("http://example.org/test#Person").with_alias("other alias");
        assert_eq!(store.save("ex", &id, &same).unwrap(), SaveOutcome::Unchanged);

        let different = Record::anchor("http://example.org/test#Human");
        assert!(matches!(
            store.save("ex", &id, &different),
            Err(StoreError::Collision { .. })
        ));
        assert_eq!(store.load(&id).unwrap().record, first);
    }

    #[test]
    fn test_list_records_filters() {
        let (_dir, store) = store();
        let ns = "http://example.org/test#";
        store
            .save("ex", &identifier_for(ns), &Record::namespace(ns))
            .unwrap();
        for name in ["A", "B"] {
            let uri = format!("{}{}", ns, name);
            store.save("ex", &identifier_for(&uri), &Record::anchor(uri.clone())).unwrap();
        }
        store
            .save("other", &identifier_for(ns), &Record::namespace(ns))
            .unwrap();

        assert_eq!(store.list_records(None, None).count(), 4);
        assert_eq!(store.list_records(Some("ex"), None).count(), 3);
        assert_eq!(store.list_records(None, Some(RecordKind::Namespace)).count(), 2);
        assert_eq!(store.list_records(Some("missing"), None).count(), 0);
        // restartable
        assert_eq!(store.list_records(Some("ex"), Some(RecordKind::Anchor)).count(), 2);
        assert_eq!(store.prefixes().unwrap(), vec!["ex".to_string(), "other".to_string()]);
    }

    #[test]
    fn test_unparseable_file_is_reported() {
        let (_dir, store) = store();
        fs::create_dir_all(store.namespace_dir("ex")).unwrap();
        fs::write(store.namespace_dir("ex").join("broken.md"), "not a record").unwrap();
        fs::write(store.namespace_dir("ex").join("notes.txt"), "ignored").unwrap();

        let items: Vec<_> = store.list_records(None, Some(RecordKind::Anchor)).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(StoreError::Record { .. })));
    }

    #[test]
    fn test_clear_namespace() {
        let (_dir, store) = store();
        let uri = "http://example.org/test#A";
        store.save("ex", &identifier_for(uri), &Record::anchor(uri)).unwrap();
        assert_eq!(store.clear_namespace("ex").unwrap(), 1);
        assert_eq!(store.clear_namespace("ex").unwrap(), 0);
        assert!(matches!(store.clear_namespace("../x"), Err(StoreError::InvalidPrefix(_))));
        assert!(matches!(store.load(&identifier_for(uri)), Err(StoreError::NotFound(_))));
    }
}
