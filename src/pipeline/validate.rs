//! Store consistency checks
//!
//! Validation never modifies the store. Every check reports [`Issue`]s:
//!
//! | kind                   | severity |
//! |------------------------|----------|
//! | unparseable record     | error    |
//! | invalid reference      | error    |
//! | unresolved reference   | error    |
//! | identifier collision   | error    |
//! | file name mismatch     | warning  |
//! | body on a non-statement| warning  |
//! | unreferenced record    | info     |
//!
//! External `<uri>` references are legal and only counted. A namespace
//! record is referenced once any statement cites a URI in its namespace.

use crate::identity::{identifier_for, Identifier};
use crate::rdf::PrefixRegistry;
use crate::record::{RecordError, RecordIndex, RecordKind, RecordStore, StoreError, StoreResult};
use crate::reference::Reference;
use crate::resolve::{ResolveError, Resolver};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// What an issue is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidRecord,
    InvalidReference,
    UnresolvedReference,
    Collision,
    NamingViolation,
    ExtraneousContent,
    Orphan,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::InvalidRecord
            | IssueKind::InvalidReference
            | IssueKind::UnresolvedReference
            | IssueKind::Collision => Severity::Error,
            IssueKind::NamingViolation | IssueKind::ExtraneousContent => Severity::Warning,
            IssueKind::Orphan => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::InvalidRecord => "invalid_record",
            IssueKind::InvalidReference => "invalid_reference",
            IssueKind::UnresolvedReference => "unresolved_reference",
            IssueKind::Collision => "collision",
            IssueKind::NamingViolation => "naming_violation",
            IssueKind::ExtraneousContent => "extraneous_content",
            IssueKind::Orphan => "orphan",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub path: PathBuf,
    pub field: Option<String>,
    pub message: String,
}

impl Issue {
    fn new(kind: IssueKind, path: &Path, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            path: path.to_path_buf(),
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.severity, self.kind, self.path.display())?;
        if let Some(field) = &self.field {
            write!(f, ":{}", field)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Counts gathered while validating
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationStats {
    pub records: usize,
    pub statements: usize,
    pub external_references: usize,
}

/// Validation outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

/// Namespace directory a record path lives in
fn dir_prefix(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Identifiers a statement reference counts as referencing: its target,
/// and the namespace record of the registered namespace it falls under
fn referenced_ids(registry: &PrefixRegistry, index: &RecordIndex, reference: &Reference) -> Vec<Identifier> {
    let (id, uri) = match reference {
        Reference::Wikilink { id, .. } => (*id, index.uri_of(id)),
        Reference::External(uri) => (identifier_for(uri), Some(uri.as_str())),
        Reference::Namespace(prefix) => {
            return registry.get_iri(prefix).map(|ns| vec![identifier_for(ns)]).unwrap_or_default()
        }
    };
    let mut ids = vec![id];
    let namespace = uri
        .and_then(|uri| registry.classify(uri))
        .and_then(|prefix| registry.get_iri(prefix).ok());
    if let Some(ns) = namespace {
        ids.push(identifier_for(ns));
    }
    ids
}

/// Validate one namespace directory, or the whole store
///
/// References and orphans are judged against the whole store either way.
pub fn validate(
    store: &RecordStore,
    registry: &PrefixRegistry,
    prefix: Option<&str>,
) -> StoreResult<ValidationReport> {
    let index = RecordIndex::build(store)?;
    let resolver = Resolver::new(registry, &index);
    let in_scope = |path: &Path| prefix.map_or(true, |p| dir_prefix(path) == p);

    let mut report = ValidationReport::default();
    let mut referenced: HashSet<Identifier> = HashSet::new();
    let mut nodes: Vec<(PathBuf, Identifier)> = Vec::new();

    for item in store.list_records(None, None) {
        let stored = match item {
            Ok(stored) => stored,
            Err(StoreError::Record { path, source }) => {
                if in_scope(&path) {
                    report.stats.records += 1;
                    let (kind, field) = match &source {
                        RecordError::InvalidReference { field, .. } => (IssueKind::InvalidReference, Some(*field)),
                        RecordError::InvalidLiteral { field, .. } => (IssueKind::InvalidRecord, Some(*field)),
                        _ => (IssueKind::InvalidRecord, None),
                    };
                    report.issues.push(Issue::new(kind, &path, field, source.to_string()));
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        let record = &stored.record;
        for (_, reference) in record.references() {
            referenced.extend(referenced_ids(registry, &index, reference));
        }
        if !in_scope(&stored.path) {
            continue;
        }
        report.stats.records += 1;

        if record.kind() != RecordKind::Statement {
            if !record.body.trim().is_empty() {
                report.issues.push(Issue::new(
                    IssueKind::ExtraneousContent,
                    &stored.path,
                    None,
                    format!("{} record has content after its header", record.kind()),
                ));
            }
            if let Some(uri) = record.uri() {
                let expected = identifier_for(uri);
                if stored.file_identifier() != Some(expected) {
                    report.issues.push(Issue::new(
                        IssueKind::NamingViolation,
                        &stored.path,
                        None,
                        format!("file name should be {}", expected),
                    ));
                }
            }
            if let Some(id) = stored.file_identifier() {
                nodes.push((stored.path.clone(), id));
            }
            continue;
        }

        report.stats.statements += 1;
        let mut resolved = true;
        for (field, reference) in record.references() {
            if reference.is_external() {
                report.stats.external_references += 1;
                continue;
            }
            if let Err(e) = resolver.from_reference(reference) {
                resolved = false;
                report
                    .issues
                    .push(Issue::new(IssueKind::UnresolvedReference, &stored.path, Some(field), e.to_string()));
            }
        }
        if !resolved {
            continue;
        }
        if let crate::record::RecordData::Statement {
            subject,
            predicate,
            object,
        } = &record.data
        {
            match resolver.statement_identifier(subject, predicate, object) {
                Ok(expected) if stored.file_identifier() != Some(expected) => {
                    report.issues.push(Issue::new(
                        IssueKind::NamingViolation,
                        &stored.path,
                        None,
                        format!("file name should be {}", expected),
                    ));
                }
                Ok(_) | Err(ResolveError::MissingUri(_)) => {}
                Err(e) => report
                    .issues
                    .push(Issue::new(IssueKind::InvalidReference, &stored.path, None, e.to_string())),
            }
        }
    }

    for collision in index.collisions() {
        if in_scope(&collision.first) || in_scope(&collision.second) {
            report.issues.push(Issue::new(
                IssueKind::Collision,
                &collision.second,
                None,
                format!(
                    "identifier {} already used by {} with different content",
                    collision.id,
                    collision.first.display()
                ),
            ));
        }
    }

    for (path, id) in nodes {
        if !referenced.contains(&id) {
            report.issues.push(Issue::new(
                IssueKind::Orphan,
                &path,
                None,
                "not referenced by any statement",
            ));
        }
    }

    info!(
        "Validated {} records: {} errors, {} warnings, {} info",
        report.stats.records,
        report.count(Severity::Error),
        report.count(Severity::Warning),
        report.count(Severity::Info)
    );
    Ok(report)
}
