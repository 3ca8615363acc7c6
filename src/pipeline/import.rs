//! Import: RDF document → records
//!
//! Phases:
//! 1. parse and pick the namespace the document defines
//! 2. register the prefix, filter languages, skolemize blank nodes
//! 3. announce every record this run will write, so references between
//!    them come out as wikilinks regardless of write order
//! 4. write namespace, anchor and blank node records, then one statement
//!    record per local triple

use super::{item_error, language_allowed, ItemError};
use crate::identity::{canonical_literal, identifier_for, statement_identifier, Identifier, SkolemMap};
use crate::rdf::{
    split_uri, Literal, ParseError, ParsedGraph, PrefixError, PrefixRegistry, RdfFormat, RdfObject,
    RdfParser, RdfSubject, Triple, OWL_ONTOLOGY, RDF_TYPE,
};
use crate::record::{Record, RecordIndex, RecordStore, SaveOutcome, StatementObject, StoreError};
use crate::resolve::{blank_alias, AliasObject, Resolver};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Fatal import errors
#[derive(Error, Debug)]
pub enum ImportError {
    /// Source file missing
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Source does not parse
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Nothing in the source or configuration names a namespace
    #[error("Cannot determine the namespace for prefix '{0}'; pass one explicitly")]
    NoNamespace(String),

    /// Prefix registry could not be updated
    #[error(transparent)]
    Prefix(#[from] PrefixError),

    /// Store not writable
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Import options
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Directory and registry prefix for the ontology
    pub prefix: String,
    /// Namespace URI, overriding detection
    pub namespace: Option<String>,
    /// Source format, overriding detection
    pub format: Option<RdfFormat>,
    /// Remove the prefix's existing records first
    pub clean: bool,
    /// Allowed language tags; empty keeps every literal
    pub languages: Vec<String>,
}

impl ImportOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }
}

/// Import statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub prefix: String,
    pub namespace: String,
    pub format: String,
    pub triples_parsed: usize,
    pub skipped_language: usize,
    /// Subject belongs to another registered namespace
    pub skipped_foreign: usize,
    /// Subject belongs to no registered namespace
    pub skipped_unclassified: usize,
    pub namespaces: usize,
    pub anchors: usize,
    pub blank_nodes: usize,
    pub statements: usize,
    /// Records written by this run
    pub created: usize,
    /// Records already present with the same content
    pub unchanged: usize,
    pub errors: Vec<ItemError>,
}

impl ImportStats {
    /// Records written or confirmed
    pub fn records(&self) -> usize {
        self.namespaces + self.anchors + self.blank_nodes + self.statements
    }
}

/// The namespace an import writes, and the URIs that count as its own
#[derive(Debug, Clone)]
pub struct ImportScope {
    pub prefix: String,
    pub namespace: String,
    /// Subjects typed `owl:Ontology`
    ontology_iris: BTreeSet<String>,
}

impl ImportScope {
    /// Pick the namespace for `prefix`
    ///
    /// In order: the explicit override, the prefix's registered namespace,
    /// the document's own declaration of the prefix, the `owl:Ontology`
    /// subject, the most frequent subject namespace.
    pub fn detect(
        prefix: &str,
        namespace: Option<&str>,
        graph: &ParsedGraph,
        registry: &PrefixRegistry,
    ) -> Option<Self> {
        let ontology_iris: BTreeSet<String> = graph
            .triples
            .iter()
            .filter(|t| {
                t.predicate.as_str() == RDF_TYPE
                    && matches!(&t.object, RdfObject::NamedNode(o) if o.as_str() == OWL_ONTOLOGY)
            })
            .filter_map(|t| match &t.subject {
                RdfSubject::NamedNode(s) => Some(s.as_str().to_string()),
                RdfSubject::BlankNode(_) => None,
            })
            .collect();

        let namespace = namespace
            .map(str::to_string)
            .or_else(|| registry.get_iri(prefix).ok().map(str::to_string))
            .or_else(|| graph.prefixes.get(prefix).cloned())
            .or_else(|| {
                ontology_iris.iter().next().map(|iri| {
                    if iri.ends_with(['#', '/']) {
                        iri.clone()
                    } else {
                        format!("{}#", iri)
                    }
                })
            })
            .or_else(|| most_frequent_namespace(&graph.triples))?;

        Some(Self {
            prefix: prefix.to_string(),
            namespace,
            ontology_iris,
        })
    }

    /// Whether a URI belongs to this ontology
    pub fn is_local(&self, registry: &PrefixRegistry, uri: &str) -> bool {
        if self.ontology_iris.contains(uri) {
            return true;
        }
        match registry.classify(uri) {
            Some(prefix) => prefix == self.prefix,
            None => uri.starts_with(&self.namespace),
        }
    }

    /// Whether a triple belongs to this ontology's records
    pub fn keeps(&self, registry: &PrefixRegistry, triple: &Triple) -> bool {
        triple.subject.iri().map_or(true, |uri| self.is_local(registry, uri))
    }
}

/// Namespace shared by most named subjects; ties go to the smaller URI
fn most_frequent_namespace(triples: &[Triple]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for triple in triples {
        if let RdfSubject::NamedNode(s) = &triple.subject {
            let (namespace, _) = split_uri(s.as_str());
            if !namespace.is_empty() {
                *counts.entry(namespace).or_default() += 1;
            }
        }
    }
    counts
        .into_iter()
        .max_by(|(a, x), (b, y)| x.cmp(y).then_with(|| b.cmp(a)))
        .map(|(namespace, _)| namespace.to_string())
}

/// Object of a triple once blank nodes are skolemized
enum Term<'a> {
    Uri(&'a str),
    Literal(&'a Literal),
}

fn subject_uri<'a>(subject: &'a RdfSubject, skolem: &'a SkolemMap) -> Option<&'a str> {
    match subject {
        RdfSubject::NamedNode(n) => Some(n.as_str()),
        RdfSubject::BlankNode(b) => skolem.uri(b.as_str()),
    }
}

fn object_term<'a>(object: &'a RdfObject, skolem: &'a SkolemMap) -> Option<Term<'a>> {
    match object {
        RdfObject::NamedNode(n) => Some(Term::Uri(n.as_str())),
        RdfObject::BlankNode(b) => skolem.uri(b.as_str()).map(Term::Uri),
        RdfObject::Literal(l) => Some(Term::Literal(l)),
    }
}

/// Records the run will write, by kind, in sorted order
#[derive(Default)]
struct Plan {
    namespaces: BTreeSet<String>,
    anchors: BTreeSet<String>,
    blank_nodes: BTreeSet<String>,
}

impl Plan {
    fn cite(&mut self, scope: &ImportScope, registry: &PrefixRegistry, uri: &str) {
        if let Some(namespace) = registry.classify(uri).and_then(|p| registry.get_iri(p).ok()) {
            self.namespaces.insert(namespace.to_string());
        }
        if uri != scope.namespace && scope.is_local(registry, uri) {
            self.anchors.insert(uri.to_string());
        }
    }
}

/// Import one RDF document into the store under `options.prefix`
pub fn import(
    store: &RecordStore,
    registry: &mut PrefixRegistry,
    source: &Path,
    options: &ImportOptions,
) -> ImportResult<ImportStats> {
    if !source.is_file() {
        return Err(ImportError::SourceNotFound(source.to_path_buf()));
    }
    let graph = RdfParser::parse_file(source, options.format)?;
    let scope = ImportScope::detect(&options.prefix, options.namespace.as_deref(), &graph, registry)
        .ok_or_else(|| ImportError::NoNamespace(options.prefix.clone()))?;
    info!(
        "Importing {} ({}, {} triples) as '{}' <{}>",
        source.display(),
        graph.format,
        graph.triples.len(),
        scope.prefix,
        scope.namespace
    );

    if registry.register(&scope.prefix, &scope.namespace)? {
        registry.save(store.root())?;
        info!("Registered prefix '{}' for <{}>", scope.prefix, scope.namespace);
    }
    let registry: &PrefixRegistry = registry;

    if options.clean {
        store.clear_namespace(&scope.prefix)?;
    }
    let index = RecordIndex::build(store)?;

    let mut stats = ImportStats {
        prefix: scope.prefix.clone(),
        namespace: scope.namespace.clone(),
        format: graph.format.to_string(),
        triples_parsed: graph.triples.len(),
        ..Default::default()
    };

    let triples: Vec<Triple> = graph
        .triples
        .into_iter()
        .filter(|t| language_allowed(&options.languages, t.object.language()))
        .collect();
    stats.skipped_language = stats.triples_parsed - triples.len();

    let skolem = SkolemMap::build(&triples, &scope.namespace);
    debug!("Skolemized {} blank nodes", skolem.len());

    let mut kept = Vec::new();
    for triple in &triples {
        if scope.keeps(registry, triple) {
            kept.push(triple);
        } else if let RdfSubject::NamedNode(s) = &triple.subject {
            if registry.classify(s.as_str()).is_some() {
                stats.skipped_foreign += 1;
            } else {
                stats.skipped_unclassified += 1;
            }
        }
    }

    let mut plan = Plan::default();
    plan.namespaces.insert(scope.namespace.clone());
    for triple in &kept {
        for label in triple.blank_labels() {
            if let Some(uri) = skolem.uri(label) {
                plan.blank_nodes.insert(uri.to_string());
            }
        }
        if let RdfSubject::NamedNode(s) = &triple.subject {
            plan.cite(&scope, registry, s.as_str());
        }
        plan.cite(&scope, registry, triple.predicate.as_str());
        match &triple.object {
            RdfObject::NamedNode(o) => plan.cite(&scope, registry, o.as_str()),
            RdfObject::Literal(l) => {
                if let Some(datatype) = l.explicit_datatype() {
                    plan.cite(&scope, registry, &datatype);
                }
            }
            RdfObject::BlankNode(_) => {}
        }
    }

    let mut resolver = Resolver::new(registry, &index);
    for uri in plan
        .namespaces
        .iter()
        .chain(&plan.anchors)
        .chain(&plan.blank_nodes)
    {
        resolver.add_local(uri);
    }

    let mut writer = Writer {
        store,
        prefix: &scope.prefix,
        stats: &mut stats,
    };
    for uri in &plan.namespaces {
        let record = Record::namespace(uri.as_str()).with_alias(resolver.namespace_alias(uri, &scope.prefix));
        if writer.save(uri, &identifier_for(uri), &record)? {
            writer.stats.namespaces += 1;
        }
    }
    for uri in &plan.anchors {
        let mut record = Record::anchor(uri.as_str());
        if let Some(alias) = resolver.anchor_alias(uri) {
            record = record.with_alias(alias);
        }
        if writer.save(uri, &identifier_for(uri), &record)? {
            writer.stats.anchors += 1;
        }
    }
    for uri in &plan.blank_nodes {
        let record = Record::blank_node(uri.as_str()).with_alias(blank_alias(uri));
        if writer.save(uri, &identifier_for(uri), &record)? {
            writer.stats.blank_nodes += 1;
        }
    }
    info!(
        "Wrote {} namespace, {} anchor and {} blank node records",
        writer.stats.namespaces, writer.stats.anchors, writer.stats.blank_nodes
    );

    for triple in kept {
        let (Some(subject), Some(object)) = (
            subject_uri(&triple.subject, &skolem),
            object_term(&triple.object, &skolem),
        ) else {
            writer.stats.errors.push(ItemError::new(
                triple.to_string(),
                "blank node missing from skolem map",
            ));
            continue;
        };
        let predicate = triple.predicate.as_str();

        let (object, canonical_object, alias_object) = match object {
            Term::Uri(uri) => (
                StatementObject::Reference(resolver.to_reference(uri)),
                uri.to_string(),
                AliasObject::Uri(uri),
            ),
            Term::Literal(literal) => (
                StatementObject::Literal(resolver.literal_value(literal)),
                canonical_literal(
                    literal.value(),
                    literal.language(),
                    literal.explicit_datatype().as_deref(),
                ),
                AliasObject::Literal(literal.value()),
            ),
        };
        let id = statement_identifier(subject, predicate, &canonical_object);
        let record = Record::statement(
            resolver.to_reference(subject),
            resolver.predicate_reference(predicate),
            object,
        )
        .with_alias(resolver.statement_alias(subject, predicate, &alias_object));

        if writer.save(&triple.to_string(), &id, &record)? {
            writer.stats.statements += 1;
        }
    }

    info!(
        "Imported '{}': {} statements, {} records ({} new, {} unchanged), {} skipped, {} errors",
        stats.prefix,
        stats.statements,
        stats.records(),
        stats.created,
        stats.unchanged,
        stats.skipped_language + stats.skipped_foreign + stats.skipped_unclassified,
        stats.errors.len()
    );
    Ok(stats)
}

/// First-writer-wins saves with per-item error collection
struct Writer<'a> {
    store: &'a RecordStore,
    prefix: &'a str,
    stats: &'a mut ImportStats,
}

impl Writer<'_> {
    /// `Ok(true)` when the record is now on disk with this content
    fn save(&mut self, location: &str, id: &Identifier, record: &Record) -> ImportResult<bool> {
        match self.store.save(self.prefix, id, record) {
            Ok(SaveOutcome::Created) => {
                self.stats.created += 1;
                Ok(true)
            }
            Ok(SaveOutcome::Unchanged) => {
                self.stats.unchanged += 1;
                Ok(true)
            }
            Err(e) => {
                let error = item_error(location, e)?;
                self.stats.errors.push(error);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordData, RecordKind};
    use std::fs;
    use tempfile::TempDir;

    const PERSON: &str = r#"@prefix ex: <http://example.org/test#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

ex:Person a owl:Class ;
    rdfs:label "Person"@en , "Personne"@fr .

owl:Thing rdfs:comment "not ours" .
"#;

    fn setup(content: &str) -> (TempDir, RecordStore, PathBuf) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("store")).unwrap();
        let source = dir.path().join("person.ttl");
        fs::write(&source, content).unwrap();
        (dir, store, source)
    }

    #[test]
    fn test_import_counts() {
        let (_dir, store, source) = setup(PERSON);
        let mut registry = PrefixRegistry::with_defaults();
        let stats = import(&store, &mut registry, &source, &ImportOptions::new("ex")).unwrap();

        assert_eq!(stats.namespace, "http://example.org/test#");
        assert_eq!(stats.triples_parsed, 4);
        assert_eq!(stats.skipped_foreign, 1);
        assert_eq!(stats.statements, 3);
        assert_eq!(stats.anchors, 1);
        assert!(stats.errors.is_empty());
        assert_eq!(registry.get_iri("ex").unwrap(), "http://example.org/test#");
        assert!(store.root().join(crate::rdf::PREFIXES_FILE).is_file());
    }

    #[test]
    fn test_language_filter() {
        let (_dir, store, source) = setup(PERSON);
        let mut registry = PrefixRegistry::with_defaults();
        let options = ImportOptions::new("ex").with_languages(["en"]);
        let stats = import(&store, &mut registry, &source, &options).unwrap();
        assert_eq!(stats.skipped_language, 1);
        assert_eq!(stats.statements, 2);
    }

    #[test]
    fn test_blank_nodes_become_records() {
        let (_dir, store, source) = setup(
            r#"@prefix ex: <http://example.org/test#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
ex:Parent owl:equivalentClass [ a owl:Restriction ; owl:onProperty ex:hasChild ] .
"#,
        );
        let mut registry = PrefixRegistry::with_defaults();
        let stats = import(&store, &mut registry, &source, &ImportOptions::new("ex")).unwrap();
        assert_eq!(stats.blank_nodes, 1);
        assert_eq!(stats.statements, 3);

        let blank = store
            .list_records(Some("ex"), Some(RecordKind::BlankNode))
            .next()
            .unwrap()
            .unwrap();
        let uri = blank.record.uri().unwrap();
        assert!(uri.starts_with("http://example.org/test/.well-known/genid/"));
        assert_eq!(blank.file_identifier(), Some(identifier_for(uri)));

        // statements about the blank node link to its record
        let linked = store
            .list_records(Some("ex"), Some(RecordKind::Statement))
            .filter_map(Result::ok)
            .filter(|s| match &s.record.data {
                RecordData::Statement { subject, .. } => subject.identifier() == Some(identifier_for(uri)),
                _ => false,
            })
            .count();
        assert_eq!(linked, 2);
    }

    #[test]
    fn test_namespace_detection() {
        let (_dir, _store, source) = setup(
            r#"<http://example.org/onto> a <http://www.w3.org/2002/07/owl#Ontology> .
<http://example.org/onto#A> a <http://www.w3.org/2002/07/owl#Class> .
"#,
        );
        let graph = RdfParser::parse_file(&source, Some(RdfFormat::Turtle)).unwrap();
        let registry = PrefixRegistry::with_defaults();

        let scope = ImportScope::detect("onto", None, &graph, &registry).unwrap();
        assert_eq!(scope.namespace, "http://example.org/onto#");
        assert!(scope.is_local(&registry, "http://example.org/onto"));
        assert!(!scope.is_local(&registry, "http://www.w3.org/2002/07/owl#Class"));

        let scope = ImportScope::detect("onto", Some("http://other.org/"), &graph, &registry).unwrap();
        assert_eq!(scope.namespace, "http://other.org/");

        let triples = vec![
            Triple::new(
                crate::rdf::NamedNode::new("http://a.org/x#1").unwrap().into(),
                crate::rdf::RdfPredicate::new(RDF_TYPE).unwrap(),
                crate::rdf::NamedNode::new("http://a.org/x#C").unwrap().into(),
            ),
        ];
        assert_eq!(most_frequent_namespace(&triples).as_deref(), Some("http://a.org/x#"));
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let mut registry = PrefixRegistry::with_defaults();
        let result = import(&store, &mut registry, &dir.path().join("nope.ttl"), &ImportOptions::new("ex"));
        assert!(matches!(result, Err(ImportError::SourceNotFound(_))));
    }
}
