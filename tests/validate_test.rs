use std::fs;
use tempfile::TempDir;
use tripledir::rdf::RDF_TYPE;
use tripledir::{
    identifier_for, import, statement_identifier, validate, ImportOptions, IssueKind, PrefixRegistry,
    Record, RecordStore, Reference, Severity, StatementObject,
};

const NS: &str = "http://example.org/test#";
const IS_DEFINED_BY: &str = "http://www.w3.org/2000/01/rdf-schema#isDefinedBy";

/// A namespace, two anchors and two statements with three planted defects:
/// - a statement pointing at an identifier no record carries
/// - a statement stored under the wrong file name
/// - an anchor no statement mentions
fn planted_store() -> (TempDir, RecordStore) {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path()).unwrap();
    let a = format!("{}A", NS);
    let b = format!("{}B", NS);

    store.save("ex", &identifier_for(NS), &Record::namespace(NS).with_alias("!ex")).unwrap();
    store.save("ex", &identifier_for(&a), &Record::anchor(a.clone()).with_alias("ex:A")).unwrap();
    store.save("ex", &identifier_for(&b), &Record::anchor(b.clone()).with_alias("ex:B")).unwrap();

    // correct content, wrong name
    let defined_by = Record::statement(
        Reference::wikilink(identifier_for(&a)),
        Reference::external(IS_DEFINED_BY),
        StatementObject::Reference(Reference::wikilink(identifier_for(NS))),
    );
    assert_ne!(identifier_for("misnamed"), statement_identifier(&a, IS_DEFINED_BY, NS));
    store.save("ex", &identifier_for("misnamed"), &defined_by).unwrap();

    // dangling object
    let missing = identifier_for(&format!("{}Missing", NS));
    let dangling = Record::statement(
        Reference::wikilink(identifier_for(&a)),
        Reference::external(RDF_TYPE),
        StatementObject::Reference(Reference::wikilink(missing)),
    );
    store.save("ex", &identifier_for("dangling"), &dangling).unwrap();

    (dir, store)
}

#[test]
fn test_planted_defects() {
    let (_dir, store) = planted_store();
    let registry = PrefixRegistry::with_defaults();
    let report = validate(&store, &registry, Some("ex")).unwrap();

    assert_eq!(report.issues.len(), 3, "{:#?}", report.issues);
    let find = |kind: IssueKind| report.issues.iter().find(|i| i.kind == kind).unwrap();

    let unresolved = find(IssueKind::UnresolvedReference);
    assert_eq!(unresolved.severity, Severity::Error);
    assert_eq!(unresolved.field.as_deref(), Some("object"));
    assert_eq!(unresolved.path, store.record_path("ex", &identifier_for("dangling")));

    let naming = find(IssueKind::NamingViolation);
    assert_eq!(naming.severity, Severity::Warning);
    assert_eq!(naming.path, store.record_path("ex", &identifier_for("misnamed")));

    let orphan = find(IssueKind::Orphan);
    assert_eq!(orphan.severity, Severity::Info);
    assert_eq!(
        orphan.path,
        store.record_path("ex", &identifier_for(&format!("{}B", NS)))
    );

    assert_eq!(report.stats.statements, 2);
    assert_eq!(report.stats.external_references, 2);
    assert!(report.has_errors());
}

#[test]
fn test_collision_is_reported() {
    let (_dir, store) = planted_store();
    let a = format!("{}A", NS);
    // same identifier, different content, in another directory
    store
        .save("zz", &identifier_for(&a), &Record::anchor(format!("{}Other", NS)))
        .unwrap();

    let registry = PrefixRegistry::with_defaults();
    let report = validate(&store, &registry, None).unwrap();
    let collisions: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::Collision)
        .collect();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].path, store.record_path("zz", &identifier_for(&a)));
}

#[test]
fn test_imported_store_is_valid() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path().join("store")).unwrap();
    let mut registry = PrefixRegistry::with_defaults();
    let source = dir.path().join("small.ttl");
    fs::write(
        &source,
        r#"@prefix ex: <http://example.org/test#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
ex:A rdfs:subClassOf ex:B ;
    rdfs:comment "multi\nline" ;
    ex:weight "1.5"^^xsd:decimal ;
    ex:part [ ex:weight "2"^^xsd:integer ] .
"#,
    )
    .unwrap();
    import(&store, &mut registry, &source, &ImportOptions::new("ex")).unwrap();

    let report = validate(&store, &registry, Some("ex")).unwrap();
    assert!(!report.has_errors(), "{:#?}", report.issues);
    assert_eq!(report.count(Severity::Warning), 0, "{:#?}", report.issues);
    // every namespace record an import writes is cited by a statement
    assert!(
        report.issues.iter().all(|i| i.kind != IssueKind::Orphan),
        "{:#?}",
        report.issues
    );
}
