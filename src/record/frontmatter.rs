//! Record text format
//!
//! ```text
//! ---
//! metadata: statement
//! subject: '[[identifier]]'
//! predicate: '[[identifier|a]]'
//! object: '"Person"@en'
//! aliases:
//! - ex:Person rdfs:label "Person"
//! ---
//! optional body
//! ```
//!
//! Header fields are emitted in a fixed order (metadata, uri, subject,
//! predicate, object, aliases) so rendering is byte-deterministic.

use super::{Record, RecordData, RecordError, RecordKind, RecordResult, StatementObject};
use crate::literal::{self, looks_like_literal};
use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// Raw header, field order is the on-disk order
#[derive(Debug, Default, Serialize, Deserialize)]
struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

/// Split text into (header YAML, body); `None` when there is no header
pub fn split(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Render a record to its on-disk text
pub fn render(record: &Record) -> RecordResult<String> {
    let mut fm = Frontmatter {
        metadata: Some(record.kind().as_str().to_string()),
        aliases: record.aliases.clone(),
        ..Default::default()
    };
    match &record.data {
        RecordData::Namespace { uri } | RecordData::BlankNode { uri } => {
            fm.uri = Some(uri.clone());
        }
        RecordData::Anchor { uri } => fm.uri = uri.clone(),
        RecordData::Statement {
            subject,
            predicate,
            object,
        } => {
            fm.subject = Some(subject.to_string());
            fm.predicate = Some(predicate.to_string());
            fm.object = Some(object.to_string());
        }
    }

    let header = serde_yaml::to_string(&fm)?;
    let mut out = String::with_capacity(header.len() + record.body.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&header);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&record.body);
    Ok(out)
}

fn required(value: Option<String>, kind: RecordKind, field: &'static str) -> RecordResult<String> {
    value.ok_or_else(|| RecordError::MissingField {
        kind: kind.to_string(),
        field,
    })
}

fn reject(value: &Option<String>, kind: RecordKind, field: &str) -> RecordResult<()> {
    match value {
        Some(_) => Err(RecordError::UnexpectedField {
            kind: kind.to_string(),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

fn reference(value: &str, field: &'static str) -> RecordResult<Reference> {
    Reference::parse(value).map_err(|source| RecordError::InvalidReference { field, source })
}

/// Parse a statement object: literal when quoted or multi-line, else a
/// reference
pub fn parse_object(value: &str) -> RecordResult<StatementObject> {
    if looks_like_literal(value) {
        literal::decode(value)
            .map(StatementObject::Literal)
            .map_err(|source| RecordError::InvalidLiteral {
                field: "object",
                source,
            })
    } else {
        reference(value, "object").map(StatementObject::Reference)
    }
}

/// Parse on-disk text into a record
///
/// Rejects unknown kinds, fields outside the kind's allowed set and missing
/// required fields.
pub fn parse(text: &str) -> RecordResult<Record> {
    let (header, body) = split(text).ok_or(RecordError::MissingFrontmatter)?;
    let fm: Frontmatter = if header.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(header)?
    };

    let metadata = fm.metadata.ok_or_else(|| RecordError::MissingField {
        kind: "unknown".to_string(),
        field: "metadata",
    })?;
    let kind: RecordKind = metadata.parse()?;
    if let Some(field) = fm.extra.keys().next() {
        return Err(RecordError::UnexpectedField {
            kind: kind.to_string(),
            field: field.clone(),
        });
    }

    let data = match kind {
        RecordKind::Namespace | RecordKind::Anchor | RecordKind::BlankNode => {
            reject(&fm.subject, kind, "subject")?;
            reject(&fm.predicate, kind, "predicate")?;
            reject(&fm.object, kind, "object")?;
            match kind {
                RecordKind::Namespace => RecordData::Namespace {
                    uri: required(fm.uri, kind, "uri")?,
                },
                RecordKind::BlankNode => RecordData::BlankNode {
                    uri: required(fm.uri, kind, "uri")?,
                },
                _ => RecordData::Anchor { uri: fm.uri },
            }
        }
        RecordKind::Statement => {
            reject(&fm.uri, kind, "uri")?;
            let subject = required(fm.subject, kind, "subject")?;
            let predicate = required(fm.predicate, kind, "predicate")?;
            let object = required(fm.object, kind, "object")?;
            RecordData::Statement {
                subject: reference(&subject, "subject")?,
                predicate: reference(&predicate, "predicate")?,
                object: parse_object(&object)?,
            }
        }
    };

    Ok(Record {
        data,
        aliases: fm.aliases,
        body: body.to_string(),
    })
}
