//! Reference resolution
//!
//! Converts between full URIs and the reference forms stored in statement
//! records. A URI becomes a `[[identifier]]` wikilink when a record for it
//! exists in the store or is being written by the current run, and an
//! external `<uri>` otherwise. `rdf:type` always renders as `[[id|a]]`.
//!
//! The resolver also produces the display aliases written into records.

use crate::identity::{canonical_literal, identifier_for, skolem, statement_identifier, Identifier};
use crate::literal::LiteralValue;
use crate::rdf::{local_name, Literal, NamedNode, PrefixRegistry, RDF_TYPE};
use crate::record::{RecordIndex, RecordKind, StatementObject};
use crate::reference::Reference;
use std::collections::HashMap;
use thiserror::Error;

/// Longest statement alias, ellipsis included
pub const MAX_ALIAS_LENGTH: usize = 100;

/// Longest literal excerpt inside a statement alias
pub const MAX_LITERAL_LENGTH: usize = 30;

/// Resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Wikilink to an identifier no record carries
    #[error("Unresolved reference {0}")]
    Unresolved(String),

    /// Namespace shorthand with an unregistered prefix
    #[error("Unknown namespace prefix '!{0}'")]
    UnknownPrefix(String),

    /// Anchor record without a URI
    #[error("Record {0} has no URI")]
    MissingUri(Identifier),

    /// Resolved URI is not a valid IRI
    #[error("Invalid IRI {0}")]
    InvalidIri(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// What a reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// A stored record; `kind` is `None` for records not yet on disk
    Record {
        id: Identifier,
        uri: Option<String>,
        kind: Option<RecordKind>,
    },
    /// External resource
    External { uri: String },
    /// Namespace shorthand
    Namespace { prefix: String, uri: String },
}

impl ResolvedTarget {
    /// Identifier of the target; external URIs map to the identifier their
    /// record would have
    pub fn identifier(&self) -> Identifier {
        match self {
            ResolvedTarget::Record { id, .. } => *id,
            ResolvedTarget::External { uri } | ResolvedTarget::Namespace { uri, .. } => {
                identifier_for(uri)
            }
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            ResolvedTarget::Record { uri, .. } => uri.as_deref(),
            ResolvedTarget::External { uri } | ResolvedTarget::Namespace { uri, .. } => Some(uri),
        }
    }
}

/// Resolver over the prefix registry and the store index
pub struct Resolver<'a> {
    registry: &'a PrefixRegistry,
    index: &'a RecordIndex,
    /// Records the current run is about to write, id → URI
    local: HashMap<Identifier, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a PrefixRegistry, index: &'a RecordIndex) -> Self {
        let mut local = HashMap::new();
        local.insert(identifier_for(RDF_TYPE), RDF_TYPE.to_string());
        Self {
            registry,
            index,
            local,
        }
    }

    pub fn registry(&self) -> &PrefixRegistry {
        self.registry
    }

    /// Announce a record the current run will write
    pub fn add_local(&mut self, uri: &str) -> Identifier {
        let id = identifier_for(uri);
        self.local.entry(id).or_insert_with(|| uri.to_string());
        id
    }

    /// Whether a target stands for a blank node: a blank node record, or
    /// a skolem URI minted under a registered namespace. Other
    /// `/.well-known/genid/` IRIs are ordinary named nodes.
    pub fn is_blank_node(&self, target: &ResolvedTarget) -> bool {
        match target {
            ResolvedTarget::Record { kind: Some(kind), .. } => *kind == RecordKind::BlankNode,
            other => other.uri().map_or(false, |uri| self.is_minted_skolem(uri)),
        }
    }

    fn is_minted_skolem(&self, uri: &str) -> bool {
        skolem::skolem_base(uri).map_or(false, |base| {
            self.registry
                .primary()
                .any(|(_, ns)| ns.trim_end_matches(['#', '/']) == base)
        })
    }

    /// Whether a record exists or is announced for this identifier
    pub fn is_known(&self, id: &Identifier) -> bool {
        self.index.contains(id) || self.local.contains_key(id)
    }

    /// Reference for a URI in subject or object position
    pub fn to_reference(&self, uri: &str) -> Reference {
        let id = identifier_for(uri);
        if self.is_known(&id) {
            Reference::wikilink(id)
        } else {
            Reference::external(uri)
        }
    }

    /// Reference for a URI in predicate position (`rdf:type` shows as `a`)
    pub fn predicate_reference(&self, uri: &str) -> Reference {
        if uri == RDF_TYPE {
            Reference::aliased(identifier_for(uri), "a")
        } else {
            self.to_reference(uri)
        }
    }

    /// Resolve a parsed reference; the wikilink alias is ignored
    pub fn from_reference(&self, reference: &Reference) -> ResolveResult<ResolvedTarget> {
        match reference {
            Reference::Wikilink { id, .. } => {
                if let Some(entry) = self.index.get(id) {
                    return Ok(ResolvedTarget::Record {
                        id: *id,
                        uri: entry.uri.clone(),
                        kind: Some(entry.kind),
                    });
                }
                match self.local.get(id) {
                    Some(uri) => Ok(ResolvedTarget::Record {
                        id: *id,
                        uri: Some(uri.clone()),
                        kind: None,
                    }),
                    None => Err(ResolveError::Unresolved(reference.to_string())),
                }
            }
            Reference::External(uri) => Ok(ResolvedTarget::External { uri: uri.clone() }),
            Reference::Namespace(prefix) => match self.registry.get_iri(prefix) {
                Ok(uri) => Ok(ResolvedTarget::Namespace {
                    prefix: prefix.clone(),
                    uri: uri.to_string(),
                }),
                Err(_) => Err(ResolveError::UnknownPrefix(prefix.clone())),
            },
        }
    }

    /// Full URI a reference stands for
    pub fn resolve_uri(&self, reference: &Reference) -> ResolveResult<String> {
        let target = self.from_reference(reference)?;
        target
            .uri()
            .map(str::to_string)
            .ok_or(ResolveError::MissingUri(target.identifier()))
    }

    /// Stored form of an RDF literal
    pub fn literal_value(&self, literal: &Literal) -> LiteralValue {
        match (literal.language(), literal.explicit_datatype()) {
            (Some(lang), _) => LiteralValue::tagged(literal.value(), lang),
            (None, Some(dt)) => LiteralValue::typed(literal.value(), self.to_reference(&dt)),
            (None, None) => LiteralValue::simple(literal.value()),
        }
    }

    /// RDF literal for a stored literal
    pub fn rdf_literal(&self, value: &LiteralValue) -> ResolveResult<Literal> {
        if let Some(lang) = &value.language {
            return Literal::new_language_tagged_literal(value.text.clone(), lang.clone())
                .map_err(|e| ResolveError::InvalidIri(e.to_string()));
        }
        match &value.datatype {
            Some(dt) => {
                let uri = self.resolve_uri(dt)?;
                let datatype = NamedNode::new(&uri).map_err(|_| ResolveError::InvalidIri(uri))?;
                Ok(Literal::new_typed_literal(value.text.clone(), datatype))
            }
            None => Ok(Literal::new_simple_literal(value.text.clone())),
        }
    }

    /// Datatype URI of a stored literal, `None` for simple and
    /// language-tagged literals
    pub fn literal_datatype(&self, value: &LiteralValue) -> ResolveResult<Option<String>> {
        match (&value.language, &value.datatype) {
            (None, Some(dt)) => self.resolve_uri(dt).map(Some),
            _ => Ok(None),
        }
    }

    /// Identifier a stored statement should carry, recomputed from the
    /// URIs its references resolve to
    pub fn statement_identifier(
        &self,
        subject: &Reference,
        predicate: &Reference,
        object: &StatementObject,
    ) -> ResolveResult<Identifier> {
        let subject = self.resolve_uri(subject)?;
        let predicate = self.resolve_uri(predicate)?;
        let object = match object {
            StatementObject::Reference(r) => self.resolve_uri(r)?,
            StatementObject::Literal(value) => canonical_literal(
                &value.text,
                value.language.as_deref(),
                self.literal_datatype(value)?.as_deref(),
            ),
        };
        Ok(statement_identifier(&subject, &predicate, &object))
    }

    /// Alias of a stored statement
    pub fn alias_for(
        &self,
        subject: &Reference,
        predicate: &Reference,
        object: &StatementObject,
    ) -> ResolveResult<String> {
        let subject = self.resolve_uri(subject)?;
        let predicate = self.resolve_uri(predicate)?;
        let alias = match object {
            StatementObject::Reference(r) => {
                let object = self.resolve_uri(r)?;
                self.statement_alias(&subject, &predicate, &AliasObject::Uri(&object))
            }
            StatementObject::Literal(value) => {
                self.statement_alias(&subject, &predicate, &AliasObject::Literal(&value.text))
            }
        };
        Ok(alias)
    }

    /// `!prefix` for a namespace URI, `fallback` when it is not registered
    pub fn namespace_alias(&self, uri: &str, fallback: &str) -> String {
        let trimmed = uri.trim_end_matches(['#', '/']);
        let prefix = self
            .registry
            .prefix_for(uri)
            .or_else(|| {
                self.registry
                    .primary()
                    .find(|(_, ns)| ns.trim_end_matches(['#', '/']) == trimmed)
                    .map(|(p, _)| p)
            })
            .unwrap_or(fallback);
        format!("!{}", prefix)
    }

    /// `prefix:localname`, or `prefix:` for an ontology IRI
    pub fn anchor_alias(&self, uri: &str) -> Option<String> {
        self.registry.compact(uri)
    }

    /// Short display form of a URI inside a statement alias
    fn term_alias(&self, uri: &str) -> String {
        if let Some(hash) = skolem::skolem_hash(uri) {
            return blank_alias_for_hash(hash);
        }
        self.registry
            .compact(uri)
            .unwrap_or_else(|| local_name(uri).to_string())
    }

    /// Alias of a statement from its resolved terms
    pub fn statement_alias(&self, subject: &str, predicate: &str, object: &AliasObject<'_>) -> String {
        let predicate = if predicate == RDF_TYPE {
            "a".to_string()
        } else {
            self.term_alias(predicate)
        };
        let object = match object {
            AliasObject::Uri(uri) => self.term_alias(uri),
            AliasObject::Literal(text) => {
                let excerpt: String = text.chars().take(MAX_LITERAL_LENGTH).collect();
                if excerpt.len() < text.len() {
                    format!("\"{}...\"", excerpt)
                } else {
                    format!("\"{}\"", excerpt)
                }
            }
        };
        truncate_alias(&format!("{} {} {}", self.term_alias(subject), predicate, object))
    }
}

/// Object term of a statement alias
#[derive(Debug, Clone, Copy)]
pub enum AliasObject<'a> {
    Uri(&'a str),
    Literal(&'a str),
}

/// `_:genid-{hash}` alias of a blank node record
pub fn blank_alias(skolem_uri: &str) -> String {
    match skolem::skolem_hash(skolem_uri) {
        Some(hash) => blank_alias_for_hash(hash),
        None => blank_alias_for_hash(skolem_uri.rsplit('/').next().unwrap_or(skolem_uri)),
    }
}

fn blank_alias_for_hash(hash: &str) -> String {
    format!("_:genid-{}", hash)
}

fn truncate_alias(alias: &str) -> String {
    // aliases are single-line
    let alias = alias.replace(['\n', '\r', '\t'], " ");
    if alias.chars().count() <= MAX_ALIAS_LENGTH {
        return alias;
    }
    let kept: String = alias.chars().take(MAX_ALIAS_LENGTH - 3).collect();
    format!("{}...", kept)
}
