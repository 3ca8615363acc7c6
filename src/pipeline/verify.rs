//! Round-trip verification
//!
//! Compares an original RDF document with what the store exports for its
//! prefix. Blank nodes are labelled with their structural hashes on both
//! sides, so the comparison is insensitive to blank node naming.

use super::export::{export, ExportError};
use super::import::ImportScope;
use super::{language_allowed, ItemError};
use crate::identity::structural_hashes;
use crate::rdf::{ParseError, PrefixRegistry, RdfFormat, RdfObject, RdfParser, RdfSubject, Triple};
use crate::record::RecordStore;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Fatal verification errors
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Prefix was never imported
    #[error("Prefix '{0}' is not registered")]
    UnknownPrefix(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Verification options, mirroring the import that produced the store
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub format: Option<RdfFormat>,
    pub languages: Vec<String>,
}

/// Verification outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub prefix: String,
    pub source_triples: usize,
    /// Source triples an import keeps
    pub expected_triples: usize,
    pub exported_triples: usize,
    pub matched: usize,
    /// In the source, not in the export
    pub missing: Vec<String>,
    /// In the export, not in the source
    pub extra: Vec<String>,
    pub export_errors: Vec<ItemError>,
}

impl VerifyReport {
    pub fn is_equivalent(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// N-Triples-like lines with blank nodes named by structural hash
fn canonical_lines(triples: &[Triple]) -> BTreeSet<String> {
    let hashes = structural_hashes(triples);
    let blank = |label: &str, hashes: &HashMap<String, String>| {
        format!("_:{}", hashes.get(label).map(String::as_str).unwrap_or(label))
    };
    triples
        .iter()
        .map(|t| {
            let subject = match &t.subject {
                RdfSubject::NamedNode(n) => n.to_string(),
                RdfSubject::BlankNode(b) => blank(b.as_str(), &hashes),
            };
            let object = match &t.object {
                RdfObject::BlankNode(b) => blank(b.as_str(), &hashes),
                other => other.to_string(),
            };
            format!("{} {} {} .", subject, t.predicate, object)
        })
        .collect()
}

/// Check that `prefix` exports the graph `source` was imported from
pub fn verify(
    store: &RecordStore,
    registry: &PrefixRegistry,
    source: &Path,
    prefix: &str,
    options: &VerifyOptions,
) -> Result<VerifyReport, VerifyError> {
    if !source.is_file() {
        return Err(VerifyError::SourceNotFound(source.to_path_buf()));
    }
    if registry.get_iri(prefix).is_err() {
        return Err(VerifyError::UnknownPrefix(prefix.to_string()));
    }
    let graph = RdfParser::parse_file(source, options.format)?;
    let scope = ImportScope::detect(prefix, None, &graph, registry)
        .ok_or_else(|| VerifyError::UnknownPrefix(prefix.to_string()))?;

    let expected: Vec<Triple> = graph
        .triples
        .iter()
        .filter(|t| language_allowed(&options.languages, t.object.language()))
        .filter(|t| scope.keeps(registry, t))
        .cloned()
        .collect();
    let exported = export(store, registry, prefix)?;

    let expected_lines = canonical_lines(&expected);
    let exported_lines = canonical_lines(&exported.triples);
    let report = VerifyReport {
        prefix: prefix.to_string(),
        source_triples: graph.triples.len(),
        expected_triples: expected_lines.len(),
        exported_triples: exported_lines.len(),
        matched: expected_lines.intersection(&exported_lines).count(),
        missing: expected_lines.difference(&exported_lines).cloned().collect(),
        extra: exported_lines.difference(&expected_lines).cloned().collect(),
        export_errors: exported.stats.errors,
    };
    info!(
        "Verified '{}' against {}: {} matched, {} missing, {} extra",
        prefix,
        source.display(),
        report.matched,
        report.missing.len(),
        report.extra.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{BlankNode, Literal, NamedNode, RdfPredicate};

    fn triple(subject: RdfSubject, predicate: &str, object: RdfObject) -> Triple {
        Triple::new(subject, RdfPredicate::new(predicate).unwrap(), object)
    }

    #[test]
    fn test_canonical_lines_ignore_blank_labels() {
        let restriction = |label: &str| {
            vec![
                triple(
                    NamedNode::new("http://e/#A").unwrap().into(),
                    "http://e/#p",
                    BlankNode::new(label).unwrap().into(),
                ),
                triple(
                    BlankNode::new(label).unwrap().into(),
                    "http://e/#q",
                    Literal::new_simple_literal("x").into(),
                ),
            ]
        };
        assert_eq!(canonical_lines(&restriction("b0")), canonical_lines(&restriction("other")));

        let mut changed = restriction("b0");
        changed[1].object = Literal::new_simple_literal("y").into();
        assert_ne!(canonical_lines(&restriction("b0")), canonical_lines(&changed));
    }
}
