//! RDF serialization formats
//!
//! Supports parsing:
//! - Turtle (TTL), and N3 read with the Turtle grammar
//! - N-Triples (NT), N-Quads (NQ), TriG, with graph names dropped
//! - RDF/XML
//! - JSON-LD (no remote contexts)
//!
//! and writing N-Triples and Turtle.
//!
//! The format of a source file is detected from its leading content and
//! falls back to the file extension.

mod jsonld;
mod rdfxml;
mod turtle;

use super::Triple;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub use jsonld::JsonLdParserWrapper;
pub use rdfxml::RdfXmlParserWrapper;
pub use turtle::{TurtleParserWrapper, TurtleSerializerWrapper};

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdfFormat {
    /// Turtle format (.ttl)
    Turtle,
    /// N-Triples format (.nt)
    NTriples,
    /// RDF/XML format (.rdf, .owl)
    RdfXml,
    /// JSON-LD format (.jsonld)
    JsonLd,
    /// Notation3 (.n3), Turtle subset only
    N3,
    /// TriG (.trig)
    TriG,
    /// N-Quads (.nq)
    NQuads,
}

impl RdfFormat {
    pub fn name(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => "turtle",
            RdfFormat::NTriples => "ntriples",
            RdfFormat::RdfXml => "rdfxml",
            RdfFormat::JsonLd => "jsonld",
            RdfFormat::N3 => "n3",
            RdfFormat::TriG => "trig",
            RdfFormat::NQuads => "nquads",
        }
    }

    /// Format implied by a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            "rdf" | "owl" | "xml" | "rdfxml" => Some(RdfFormat::RdfXml),
            "jsonld" | "json" => Some(RdfFormat::JsonLd),
            "n3" => Some(RdfFormat::N3),
            "trig" => Some(RdfFormat::TriG),
            "nq" | "nquads" => Some(RdfFormat::NQuads),
            _ => None,
        }
    }

    /// Format implied by the first significant content of a document
    pub fn sniff(content: &str) -> Option<Self> {
        let content = content.trim_start_matches('\u{feff}');
        let head = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))?;

        if head.starts_with("@prefix") || head.starts_with("@base") {
            return Some(RdfFormat::Turtle);
        }
        let upper = head.get(..7).unwrap_or(head).to_ascii_uppercase();
        if upper.starts_with("PREFIX ") || upper.starts_with("BASE ") {
            return Some(RdfFormat::Turtle);
        }
        if head.starts_with("<?xml") || head.starts_with("<rdf:RDF") {
            return Some(RdfFormat::RdfXml);
        }
        if (head.starts_with('{') || head.starts_with('[')) && content.contains("\"@") {
            return Some(RdfFormat::JsonLd);
        }
        None
    }

    /// Content signature first, then extension
    ///
    /// A Turtle signature in a `.n3` or `.trig` file keeps the extension's
    /// format, both being Turtle supersets.
    pub fn detect(content: &str, path: &Path) -> Option<Self> {
        let by_extension = Self::from_extension(path);
        match (Self::sniff(content), by_extension) {
            (Some(RdfFormat::Turtle), Some(ext @ (RdfFormat::N3 | RdfFormat::TriG))) => Some(ext),
            (Some(sniffed), _) => Some(sniffed),
            (None, ext) => ext,
        }
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RdfFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "turtle" | "ttl" => Ok(RdfFormat::Turtle),
            "ntriples" | "n-triples" | "nt" => Ok(RdfFormat::NTriples),
            "rdfxml" | "rdf/xml" | "xml" | "rdf" | "owl" => Ok(RdfFormat::RdfXml),
            "jsonld" | "json-ld" => Ok(RdfFormat::JsonLd),
            "n3" => Ok(RdfFormat::N3),
            "trig" => Ok(RdfFormat::TriG),
            "nquads" | "n-quads" | "nq" => Ok(RdfFormat::NQuads),
            other => Err(ParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error reported by the format's parser
    #[error("{format} parse error in {location}: {message}")]
    Syntax {
        format: RdfFormat,
        location: String,
        message: String,
    },

    /// Content and extension both failed to identify a format
    #[error("Cannot detect RDF format of {0}")]
    UnknownFormat(String),

    /// Invalid base IRI
    #[error("Invalid base IRI {0}")]
    InvalidBase(String),
}

impl ParseError {
    pub(crate) fn syntax(format: RdfFormat, message: impl fmt::Display) -> Self {
        ParseError::Syntax {
            format,
            location: "<input>".to_string(),
            message: message.to_string(),
        }
    }

    fn at(self, location: &Path) -> Self {
        match self {
            ParseError::Syntax { format, message, .. } => ParseError::Syntax {
                format,
                location: location.display().to_string(),
                message,
            },
            other => other,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(RdfFormat),
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// Triples of one parsed document plus the prefixes it declared
#[derive(Debug, Clone)]
pub struct ParsedGraph {
    pub format: RdfFormat,
    pub triples: Vec<Triple>,
    /// Prefix → namespace declarations, in document order
    pub prefixes: IndexMap<String, String>,
}

/// RDF parser
pub struct RdfParser;

impl RdfParser {
    /// Parse RDF data from a string
    pub fn parse(input: &str, format: RdfFormat, base: Option<&str>) -> ParseResult<ParsedGraph> {
        let base = match base {
            Some(base) => Some(
                oxiri::Iri::parse(base.to_string())
                    .map_err(|e| ParseError::InvalidBase(format!("{}: {}", base, e)))?,
            ),
            None => None,
        };
        let (triples, prefixes) = match format {
            RdfFormat::Turtle | RdfFormat::N3 => (
                TurtleParserWrapper::parse(input, base, format)?,
                turtle::declared_prefixes(input),
            ),
            RdfFormat::TriG => (
                TurtleParserWrapper::parse_trig(input, base)?,
                turtle::declared_prefixes(input),
            ),
            RdfFormat::NTriples => (TurtleParserWrapper::parse_ntriples(input)?, IndexMap::new()),
            RdfFormat::NQuads => (TurtleParserWrapper::parse_nquads(input)?, IndexMap::new()),
            RdfFormat::RdfXml => (
                RdfXmlParserWrapper::parse(input, base)?,
                rdfxml::declared_prefixes(input),
            ),
            RdfFormat::JsonLd => JsonLdParserWrapper::parse(input)?,
        };

        // repeated statements are one triple in the graph
        let mut seen = HashSet::with_capacity(triples.len());
        let triples: Vec<Triple> = triples.into_iter().filter(|t| seen.insert(t.clone())).collect();
        debug!("Parsed {} triples as {}", triples.len(), format);
        Ok(ParsedGraph {
            format,
            triples,
            prefixes,
        })
    }

    /// Parse RDF data from a file, detecting the format unless given
    pub fn parse_file(path: &Path, format: Option<RdfFormat>) -> ParseResult<ParsedGraph> {
        let content = std::fs::read_to_string(path)?;
        let format = match format {
            Some(format) => format,
            None => RdfFormat::detect(&content, path)
                .ok_or_else(|| ParseError::UnknownFormat(path.display().to_string()))?,
        };
        Self::parse(&content, format, None).map_err(|e| e.at(path))
    }
}

/// RDF serializer
pub struct RdfSerializer;

impl RdfSerializer {
    /// Serialize triples to a string
    pub fn serialize(triples: &[Triple], format: RdfFormat) -> SerializeResult<String> {
        match format {
            RdfFormat::NTriples => TurtleSerializerWrapper::serialize_ntriples(triples),
            RdfFormat::Turtle => TurtleSerializerWrapper::serialize(triples),
            other => Err(SerializeError::UnsupportedFormat(other)),
        }
    }

    /// Serialize triples to a file
    pub fn serialize_file(triples: &[Triple], path: &Path, format: RdfFormat) -> SerializeResult<()> {
        let output = Self::serialize(triples, format)?;
        std::fs::write(path, output)?;
        Ok(())
    }
}
