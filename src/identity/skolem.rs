//! Structural skolemization of blank nodes
//!
//! Parser labels are only stable within one parse, so blank node identity is
//! derived from graph structure instead. Each blank node starts with the same
//! colour; every round rehashes a node's colour together with the sorted
//! signatures of its incident triples, where neighbouring blank nodes appear
//! as their current colour. Refinement runs per connected blank component
//! until the number of distinct colours stops growing. Nodes that are still
//! indistinguishable afterwards are ordered by first appearance and
//! disambiguated with their index.

use crate::identity::canonical_literal;
use crate::rdf::{RdfObject, RdfSubject, Triple};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Number of hex digits of the structural hash kept in skolem URIs
pub const HASH_LEN: usize = 16;

const WELL_KNOWN_GENID: &str = "/.well-known/genid/";

/// Skolem URI for a content hash under a namespace
pub fn skolem_uri(namespace: &str, hash: &str) -> String {
    format!(
        "{}{}{}",
        namespace.trim_end_matches(['#', '/']),
        WELL_KNOWN_GENID,
        hash
    )
}

/// Content hash carried by a skolem URI of the form [`skolem_uri`] mints:
/// exactly `HASH_LEN` lowercase hex digits after the well-known segment
pub fn skolem_hash(uri: &str) -> Option<&str> {
    uri.rfind(WELL_KNOWN_GENID)
        .map(|pos| &uri[pos + WELL_KNOWN_GENID.len()..])
        .filter(|hash| hash.len() == HASH_LEN && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
}

/// Namespace a minted skolem URI was derived from, separator trimmed
pub fn skolem_base(uri: &str) -> Option<&str> {
    skolem_hash(uri)?;
    uri.rfind(WELL_KNOWN_GENID).map(|pos| &uri[..pos])
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Blank node labels in order of first appearance
fn labels_in_order(triples: &[Triple]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for triple in triples {
        for label in triple.blank_labels() {
            if seen.insert(label) {
                order.push(label);
            }
        }
    }
    order
}

/// Connected components of the blank-node-only subgraph, as lists of
/// indices into `order`
fn blank_components(triples: &[Triple], order: &[&str]) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = order.iter().enumerate().map(|(i, l)| (*l, i)).collect();
    let mut parent: Vec<usize> = (0..order.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for triple in triples {
        if let (RdfSubject::BlankNode(s), RdfObject::BlankNode(o)) = (&triple.subject, &triple.object) {
            let a = find(&mut parent, index[s.as_str()]);
            let b = find(&mut parent, index[o.as_str()]);
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..order.len() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }
    groups.into_values().collect()
}

fn term_signature(label: &str, me: &str, colours: &HashMap<&str, String>) -> String {
    if label == me {
        "@self".to_string()
    } else {
        format!("_:{}", colours.get(label).map(String::as_str).unwrap_or(""))
    }
}

fn triple_signature(triple: &Triple, me: &str, colours: &HashMap<&str, String>) -> String {
    let subject = match &triple.subject {
        RdfSubject::NamedNode(n) => format!("<{}>", n.as_str()),
        RdfSubject::BlankNode(b) => term_signature(b.as_str(), me, colours),
    };
    let object = match &triple.object {
        RdfObject::NamedNode(n) => format!("<{}>", n.as_str()),
        RdfObject::BlankNode(b) => term_signature(b.as_str(), me, colours),
        RdfObject::Literal(l) => canonical_literal(
            l.value(),
            l.language(),
            l.explicit_datatype().as_deref(),
        ),
    };
    format!("{} <{}> {}", subject, triple.predicate.as_str(), object)
}

/// Full SHA-256 structural hash of every blank node, keyed by parser label
pub fn structural_hashes(triples: &[Triple]) -> HashMap<String, String> {
    let order = labels_in_order(triples);
    if order.is_empty() {
        return HashMap::new();
    }

    let mut incident: HashMap<&str, Vec<&Triple>> = HashMap::new();
    for triple in triples {
        let mut labels: Vec<&str> = triple.blank_labels().collect();
        labels.dedup();
        for label in labels {
            incident.entry(label).or_default().push(triple);
        }
    }

    let initial = sha256_hex("_:");
    let mut colours: HashMap<&str, String> =
        order.iter().map(|l| (*l, initial.clone())).collect();

    for component in blank_components(triples, &order) {
        let members: Vec<&str> = component.iter().map(|&i| order[i]).collect();
        let mut distinct = 1;
        // a partition of n nodes can split at most n - 1 times
        for _ in 0..=members.len() {
            let next: Vec<String> = members
                .iter()
                .map(|&me| {
                    let mut signatures: Vec<String> = incident
                        .get(me)
                        .map(|ts| ts.iter().map(|t| triple_signature(t, me, &colours)).collect())
                        .unwrap_or_default();
                    signatures.sort();
                    sha256_hex(&format!("{}\n{}", colours[me], signatures.join("\n")))
                })
                .collect();
            let count = next.iter().collect::<HashSet<_>>().len();
            for (&me, colour) in members.iter().zip(next) {
                colours.insert(me, colour);
            }
            if count <= distinct {
                break;
            }
            distinct = count;
        }
    }

    let mut tied: HashMap<String, usize> = HashMap::new();
    for label in &order {
        *tied.entry(colours[label].clone()).or_default() += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut hashes = HashMap::with_capacity(order.len());
    for label in order {
        let colour = &colours[label];
        let hash = if tied[colour] > 1 {
            let n = seen.entry(colour.clone()).or_default();
            let hash = sha256_hex(&format!("{}#{}", colour, n));
            *n += 1;
            hash
        } else {
            colour.clone()
        };
        hashes.insert(label.to_string(), hash);
    }
    hashes
}

/// Parser label → skolem URI assignment for one parsed graph
#[derive(Debug, Clone, Default)]
pub struct SkolemMap {
    uris: HashMap<String, String>,
}

impl SkolemMap {
    /// Skolemize every blank node of a graph under a namespace
    pub fn build(triples: &[Triple], namespace: &str) -> Self {
        let uris = structural_hashes(triples)
            .into_iter()
            .map(|(label, hash)| {
                let uri = skolem_uri(namespace, &hash[..HASH_LEN]);
                (label, uri)
            })
            .collect();
        Self { uris }
    }

    /// Skolem URI for a parser label
    pub fn uri(&self, label: &str) -> Option<&str> {
        self.uris.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Skolem URIs in sorted order
    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.uris.values().map(String::as_str).collect();
        uris.sort_unstable();
        uris
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{BlankNode, Literal, NamedNode, RdfPredicate};

    fn named(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    fn pred(iri: &str) -> RdfPredicate {
        RdfPredicate::new(iri).unwrap()
    }

    fn blank(label: &str) -> BlankNode {
        BlankNode::new(label).unwrap()
    }

    /// `ex:A rdfs:subClassOf [ owl:onProperty ex:p ; owl:someValuesFrom ex:B ]`
    fn restriction(label: &str, target: &str) -> Vec<Triple> {
        vec![
            Triple::new(
                named("http://example.org/test#A").into(),
                pred("http://www.w3.org/2000/01/rdf-schema#subClassOf"),
                blank(label).into(),
            ),
            Triple::new(
                blank(label).into(),
                pred("http://www.w3.org/2002/07/owl#onProperty"),
                named("http://example.org/test#p").into(),
            ),
            Triple::new(
                blank(label).into(),
                pred("http://www.w3.org/2002/07/owl#someValuesFrom"),
                named(target).into(),
            ),
        ]
    }

    #[test]
    fn test_skolem_uri() {
        assert_eq!(
            skolem_uri("http://example.org/test#", "0123456789abcdef"),
            "http://example.org/test/.well-known/genid/0123456789abcdef"
        );
        assert_eq!(
            skolem_hash("http://example.org/test/.well-known/genid/0123456789abcdef"),
            Some("0123456789abcdef")
        );
        assert_eq!(skolem_hash("http://example.org/test#A"), None);
        assert_eq!(
            skolem_base("http://example.org/test/.well-known/genid/0123456789abcdef"),
            Some("http://example.org/test")
        );
    }

    #[test]
    fn test_foreign_genid_iris_are_not_minted() {
        assert_eq!(skolem_hash("http://other.org/.well-known/genid/abc"), None);
        assert_eq!(skolem_hash("http://other.org/.well-known/genid/0123456789ABCDEF"), None);
        assert_eq!(skolem_hash("http://other.org/.well-known/genid/0123456789abcdef0"), None);
        assert_eq!(skolem_base("http://other.org/.well-known/genid/abc"), None);
    }

    #[test]
    fn test_hash_independent_of_labels() {
        let a = SkolemMap::build(&restriction("b0", "http://example.org/test#B"), "http://example.org/test#");
        let b = SkolemMap::build(&restriction("genid42", "http://example.org/test#B"), "http://example.org/test#");
        assert_eq!(a.uri("b0"), b.uri("genid42"));
        let uri = a.uri("b0").unwrap();
        assert_eq!(skolem_hash(uri).unwrap().len(), HASH_LEN);
    }

    #[test]
    fn test_hash_depends_on_content() {
        let a = structural_hashes(&restriction("b0", "http://example.org/test#B"));
        let b = structural_hashes(&restriction("b0", "http://example.org/test#C"));
        assert_ne!(a["b0"], b["b0"]);
    }

    #[test]
    fn test_hash_sees_through_blank_neighbours() {
        // two list cells differing only in the value of the second cell
        let list = |value: &str| {
            vec![
                Triple::new(blank("l0").into(), pred("http://example.org/first"), Literal::new_simple_literal("x").into()),
                Triple::new(blank("l0").into(), pred("http://example.org/rest"), blank("l1").into()),
                Triple::new(blank("l1").into(), pred("http://example.org/first"), Literal::new_simple_literal(value).into()),
            ]
        };
        let a = structural_hashes(&list("y"));
        let b = structural_hashes(&list("z"));
        assert_ne!(a["l0"], b["l0"]);
    }

    #[test]
    fn test_identical_structures_are_disambiguated() {
        let mut triples = restriction("b0", "http://example.org/test#B");
        triples.extend(restriction("b1", "http://example.org/test#B"));
        let hashes = structural_hashes(&triples);
        assert_eq!(hashes.len(), 2);
        assert_ne!(hashes["b0"], hashes["b1"]);
    }

    #[test]
    fn test_no_blank_nodes() {
        let triples = vec![Triple::new(
            named("http://example.org/a").into(),
            pred("http://example.org/p"),
            named("http://example.org/b").into(),
        )];
        assert!(SkolemMap::build(&triples, "http://example.org/").is_empty());
    }
}
