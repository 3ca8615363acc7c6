use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tripledir::identity::{identifier_for, statement_identifier, SkolemMap};
use tripledir::literal;
use tripledir::{RdfFormat, RdfParser};

const NS: &str = "http://example.org/bench#";

/// Benchmark identifier derivation for resources and statements
fn bench_identifiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("identifiers");

    for size in [100, 1000, 10_000].iter() {
        let uris: Vec<String> = (0..*size).map(|i| format!("{}Class{}", NS, i)).collect();
        group.bench_with_input(BenchmarkId::new("resource", size), &uris, |b, uris| {
            b.iter(|| {
                for uri in uris {
                    criterion::black_box(identifier_for(uri));
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("statement", size), &uris, |b, uris| {
            b.iter(|| {
                for uri in uris {
                    criterion::black_box(statement_identifier(
                        uri,
                        "http://www.w3.org/2000/01/rdf-schema#label",
                        "\"label\"@en",
                    ));
                }
            });
        });
    }
    group.finish();
}

/// Benchmark literal encoding and decoding
fn bench_literals(c: &mut Criterion) {
    let mut group = c.benchmark_group("literals");
    let text = "A \"quoted\" comment\r\nspanning lines with a \\ backslash";

    group.bench_function("encode", |b| {
        b.iter(|| criterion::black_box(literal::encode(text, Some("en"), None)));
    });

    let encoded = literal::encode(text, Some("en"), None);
    group.bench_function("decode", |b| {
        b.iter(|| criterion::black_box(literal::decode(&encoded)));
    });
    group.finish();
}

/// Benchmark blank node skolemization over chains of restrictions
fn bench_skolemization(c: &mut Criterion) {
    let mut group = c.benchmark_group("skolemization");

    for size in [10, 100, 1000].iter() {
        // Setup: one restriction blank node per class
        let mut turtle = String::from(
            "@prefix ex: <http://example.org/bench#> .\n\
             @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n",
        );
        for i in 0..*size {
            turtle.push_str(&format!(
                "ex:C{} rdfs:subClassOf [ a owl:Restriction ; owl:onProperty ex:p{} ; owl:someValuesFrom ex:C{} ] .\n",
                i,
                i % 7,
                (i + 1) % size
            ));
        }
        let graph = RdfParser::parse(&turtle, RdfFormat::Turtle, None).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &graph.triples, |b, triples| {
            b.iter(|| {
                let map = SkolemMap::build(triples, NS);
                criterion::black_box(map.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_identifiers, bench_literals, bench_skolemization);
criterion_main!(benches);
