//! RDF namespace and prefix management
//!
//! The prefix registry is the single configuration object mapping short
//! prefixes to namespace URIs. It is loaded once from `_prefixes.yaml` at the
//! store root and passed by reference to every component that needs prefix
//! resolution.
//!
//! Entries whose prefix ends in `-ontology` are ontology IRI variants: they
//! map the IRI an `owl:Ontology` declaration uses (usually the namespace
//! without its trailing `#`) back to the base prefix.

use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Name of the registry file at the store root
pub const PREFIXES_FILE: &str = "_prefixes.yaml";

const ONTOLOGY_SUFFIX: &str = "-ontology";

/// Prefix errors
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Prefix already bound to another namespace
    #[error("Prefix '{prefix}' is already bound to {existing}, cannot rebind to {requested}")]
    Conflict {
        prefix: String,
        existing: String,
        requested: String,
    },

    /// Registry file could not be read or written
    #[error("Prefix registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry file is not a prefix → URI mapping
    #[error("Invalid prefix registry: {0}")]
    Format(#[from] serde_yaml::Error),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Namespace (prefix → IRI mapping)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Prefix
    pub prefix: String,
    /// IRI
    pub iri: String,
}

impl Namespace {
    /// Create a new namespace
    pub fn new(prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            iri: iri.into(),
        }
    }
}

/// Whether a URI denotes a whole vocabulary rather than a term in it
pub fn is_namespace_uri(uri: &str) -> bool {
    uri.ends_with('#') || uri.ends_with('/')
}

/// Split a URI into (namespace, local name) at the last `#`, else the last `/`
pub fn split_uri(uri: &str) -> (&str, &str) {
    if let Some(pos) = uri.rfind('#') {
        return (&uri[..=pos], &uri[pos + 1..]);
    }
    match uri.trim_end_matches('/').rfind('/') {
        Some(pos) => (&uri[..=pos], &uri[pos + 1..]),
        None => ("", uri),
    }
}

/// Local name of a URI (part after `#` or the last path segment)
pub fn local_name(uri: &str) -> &str {
    if let Some(pos) = uri.rfind('#') {
        return &uri[pos + 1..];
    }
    let trimmed = uri.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Prefix registry, insertion ordered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefixRegistry {
    /// Prefix → IRI mappings
    prefixes: IndexMap<String, String>,
}

impl PrefixRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the common W3C and community vocabularies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (prefix, iri) in [
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
            ("owl", "http://www.w3.org/2002/07/owl#"),
            ("xsd", "http://www.w3.org/2001/XMLSchema#"),
            ("dc", "http://purl.org/dc/elements/1.1/"),
            ("dcterms", "http://purl.org/dc/terms/"),
            ("dcam", "http://purl.org/dc/dcam/"),
            ("skos", "http://www.w3.org/2004/02/skos/core#"),
            ("foaf", "http://xmlns.com/foaf/0.1/"),
            ("prov", "http://www.w3.org/ns/prov#"),
            ("time", "http://www.w3.org/2006/time#"),
            ("geo", "http://www.w3.org/2003/01/geo/wgs84_pos#"),
            ("vcard", "http://www.w3.org/2006/vcard/ns#"),
            ("doap", "http://usefulinc.com/ns/doap#"),
            ("sioc", "http://rdfs.org/sioc/ns#"),
        ] {
            registry.prefixes.insert(prefix.to_string(), iri.to_string());
        }
        for (prefix, iri) in [
            ("rdf-ontology", "http://www.w3.org/1999/02/22-rdf-syntax-ns"),
            ("rdfs-ontology", "http://www.w3.org/2000/01/rdf-schema"),
            ("owl-ontology", "http://www.w3.org/2002/07/owl"),
        ] {
            registry.prefixes.insert(prefix.to_string(), iri.to_string());
        }
        registry
    }

    /// Load `_prefixes.yaml` from a store root, falling back to the defaults
    /// when the file does not exist yet
    pub fn load(root: &Path) -> PrefixResult<Self> {
        let path = root.join(PREFIXES_FILE);
        if !path.exists() {
            debug!("No {} under {}, using defaults", PREFIXES_FILE, root.display());
            return Ok(Self::with_defaults());
        }
        let content = fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    /// Parse a registry from YAML text
    pub fn from_yaml(content: &str) -> PrefixResult<Self> {
        let prefixes: Option<IndexMap<String, String>> = serde_yaml::from_str(content)?;
        Ok(Self {
            prefixes: prefixes.unwrap_or_default(),
        })
    }

    /// Render the registry as YAML text
    pub fn to_yaml(&self) -> PrefixResult<String> {
        Ok(serde_yaml::to_string(&self.prefixes)?)
    }

    /// Write `_prefixes.yaml` under a store root
    pub fn save(&self, root: &Path) -> PrefixResult<()> {
        fs::create_dir_all(root)?;
        fs::write(root.join(PREFIXES_FILE), self.to_yaml()?)?;
        Ok(())
    }

    /// Register a prefix
    ///
    /// Returns `true` when the registry changed. Rebinding an existing prefix
    /// to a different namespace is refused.
    pub fn register(&mut self, prefix: &str, iri: &str) -> PrefixResult<bool> {
        if let Some(existing) = self.prefixes.get(prefix) {
            if existing == iri {
                return Ok(false);
            }
            return Err(PrefixError::Conflict {
                prefix: prefix.to_string(),
                existing: existing.clone(),
                requested: iri.to_string(),
            });
        }
        self.prefixes.insert(prefix.to_string(), iri.to_string());

        let ontology_iri = iri.trim_end_matches(['#', '/']);
        let ontology_prefix = format!("{}{}", prefix, ONTOLOGY_SUFFIX);
        if is_namespace_uri(iri)
            && !ontology_iri.is_empty()
            && !self.prefixes.contains_key(&ontology_prefix)
            && self.ontology_prefix(ontology_iri).is_none()
        {
            self.prefixes.insert(ontology_prefix, ontology_iri.to_string());
        }
        Ok(true)
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> PrefixResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Prefix bound to exactly this namespace URI
    pub fn prefix_for(&self, iri: &str) -> Option<&str> {
        self.primary()
            .find(|(_, ns)| *ns == iri)
            .map(|(prefix, _)| prefix)
    }

    /// Longest registered namespace that is a prefix of `iri`
    pub fn longest_match(&self, iri: &str) -> Option<(&str, &str)> {
        self.primary()
            .filter(|(_, ns)| !ns.is_empty() && iri.starts_with(ns))
            .max_by_key(|(_, ns)| ns.len())
    }

    /// Prefix whose ontology IRI is exactly `iri`
    ///
    /// Checks `-ontology` variants first, then namespaces whose trimmed form
    /// equals the IRI.
    pub fn ontology_prefix(&self, iri: &str) -> Option<&str> {
        let variant = self.prefixes.iter().find_map(|(prefix, ns)| {
            if ns == iri {
                prefix.strip_suffix(ONTOLOGY_SUFFIX)
            } else {
                None
            }
        });
        variant.or_else(|| {
            self.primary()
                .find(|(_, ns)| is_namespace_uri(ns) && ns.trim_end_matches(['#', '/']) == iri)
                .map(|(prefix, _)| prefix)
        })
    }

    /// Prefix a URI belongs to: longest namespace match, else ontology IRI
    pub fn classify(&self, iri: &str) -> Option<&str> {
        self.longest_match(iri)
            .map(|(prefix, _)| prefix)
            .or_else(|| self.ontology_prefix(iri))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        if let Some(pos) = compact_iri.find(':') {
            let prefix = &compact_iri[..pos];
            let local = &compact_iri[pos + 1..];
            let iri = self.get_iri(prefix)?;
            Ok(format!("{}{}", iri, local))
        } else {
            Err(PrefixError::InvalidIri(compact_iri.to_string()))
        }
    }

    /// Compact an IRI using the longest matching prefix
    pub fn compact(&self, iri: &str) -> Option<String> {
        if let Some((prefix, ns)) = self.longest_match(iri) {
            return Some(format!("{}:{}", prefix, &iri[ns.len()..]));
        }
        self.ontology_prefix(iri).map(|prefix| format!("{}:", prefix))
    }

    /// Primary (non `-ontology`) prefixes in registration order
    pub fn primary(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| !prefix.ends_with(ONTOLOGY_SUFFIX))
            .map(|(prefix, ns)| (prefix.as_str(), ns.as_str()))
    }

    /// Get all registered prefixes
    pub fn prefixes(&self) -> Vec<Namespace> {
        self.prefixes
            .iter()
            .map(|(prefix, iri)| Namespace::new(prefix.clone(), iri.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
