//! Literal codec
//!
//! On-disk literal syntax:
//!
//! ```text
//! "text"
//! "text"@lang
//! "text"^^[[identifier]]
//! "text"^^<datatype-uri>
//! ```
//!
//! Backslash, double quote, newline and tab are escaped. CR and CRLF are
//! normalised to LF before escaping. A value that does not start with a
//! quote but spans several lines is read verbatim (block form).

use crate::reference::{Reference, ReferenceError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

static LANGUAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$").expect("valid language pattern"));

/// Literal syntax errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    /// Empty value
    #[error("Empty literal")]
    Empty,

    /// Value neither quoted nor in block form
    #[error("Literal is not quoted: {0}")]
    Unquoted(String),

    /// No closing quote
    #[error("Unterminated literal: {0}")]
    Unterminated(String),

    /// Escape sequence outside the supported set
    #[error("Unknown escape '\\{0}' in literal")]
    UnknownEscape(char),

    /// Malformed language tag
    #[error("Invalid language tag '{0}'")]
    InvalidLanguage(String),

    /// Text after the closing quote that is neither `@lang` nor `^^datatype`
    #[error("Unrecognized literal suffix '{0}'")]
    UnrecognizedSuffix(String),

    /// Datatype that is not a wikilink or external URI
    #[error("Invalid literal datatype: {0}")]
    InvalidDatatype(#[from] ReferenceError),
}

pub type LiteralResult<T> = Result<T, LiteralError>;

/// Literal as stored in a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiteralValue {
    /// Lexical value
    pub text: String,
    /// Language tag, exclusive with `datatype`
    pub language: Option<String>,
    /// Datatype reference (`[[id]]` or `<uri>`)
    pub datatype: Option<Reference>,
}

impl LiteralValue {
    pub fn simple(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn tagged(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    pub fn typed(text: impl Into<String>, datatype: Reference) -> Self {
        Self {
            text: text.into(),
            language: None,
            datatype: Some(datatype),
        }
    }

    /// On-disk encoding
    pub fn encode(&self) -> String {
        encode(&self.text, self.language.as_deref(), self.datatype.as_ref())
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Normalise line endings to LF
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Escape a literal value for the quoted form
pub fn escape(text: &str) -> String {
    let text = normalize_newlines(text);
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Encode text with an optional language tag or datatype
///
/// The language wins when both are given.
pub fn encode(text: &str, language: Option<&str>, datatype: Option<&Reference>) -> String {
    let escaped = escape(text);
    match (language, datatype) {
        (Some(lang), _) => format!("\"{}\"@{}", escaped, lang),
        (None, Some(dt)) => format!("\"{}\"^^{}", escaped, dt.without_alias()),
        (None, None) => format!("\"{}\"", escaped),
    }
}

/// Read the quoted part; returns the unescaped text and the remainder after
/// the closing quote
fn read_quoted(encoded: &str) -> LiteralResult<(String, &str)> {
    let mut text = String::new();
    let mut chars = encoded.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((text, &encoded[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => text.push('\\'),
                Some((_, '"')) => text.push('"'),
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, other)) => return Err(LiteralError::UnknownEscape(other)),
                None => break,
            },
            c => text.push(c),
        }
    }
    Err(LiteralError::Unterminated(encoded.to_string()))
}

/// Decode an on-disk literal
pub fn decode(encoded: &str) -> LiteralResult<LiteralValue> {
    if encoded.is_empty() {
        return Err(LiteralError::Empty);
    }
    if !encoded.starts_with('"') {
        if encoded.contains('\n') {
            return Ok(LiteralValue::simple(normalize_newlines(encoded)));
        }
        return Err(LiteralError::Unquoted(encoded.to_string()));
    }

    let (text, suffix) = read_quoted(encoded)?;
    if suffix.is_empty() {
        return Ok(LiteralValue::simple(text));
    }
    if let Some(lang) = suffix.strip_prefix('@') {
        if !LANGUAGE_TAG.is_match(lang) {
            return Err(LiteralError::InvalidLanguage(lang.to_string()));
        }
        return Ok(LiteralValue::tagged(text, lang));
    }
    if let Some(datatype) = suffix.strip_prefix("^^") {
        let datatype = Reference::parse(datatype)?;
        if let Reference::Namespace(_) = datatype {
            return Err(LiteralError::InvalidDatatype(ReferenceError::Invalid(
                datatype.to_string(),
            )));
        }
        return Ok(LiteralValue::typed(text, datatype.without_alias()));
    }
    Err(LiteralError::UnrecognizedSuffix(suffix.to_string()))
}

/// Whether a stored object value is a literal rather than a reference
pub fn looks_like_literal(value: &str) -> bool {
    value.starts_with('"') || (value.contains('\n') && !value.starts_with("[["))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::identifier_for;

    fn round_trip(value: LiteralValue) {
        let encoded = value.encode();
        assert_eq!(decode(&encoded).unwrap(), value, "encoded as {}", encoded);
    }

    #[test]
    fn test_encode_forms() {
        assert_eq!(encode("Person", Some("en"), None), "\"Person\"@en");
        assert_eq!(encode("", None, None), "\"\"");
        let xsd_int = Reference::external("http://www.w3.org/2001/XMLSchema#integer");
        assert_eq!(
            encode("42", None, Some(&xsd_int)),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_round_trip_awkward_text() {
        let datatype = Reference::wikilink(identifier_for("http://www.w3.org/2001/XMLSchema#integer"));
        for text in ["", "plain", "say \"hi\"", "back\\slash", "line\nbreak", "tab\there", "\\n", "\"\"", "trailing\\"] {
            round_trip(LiteralValue::simple(text));
            round_trip(LiteralValue::tagged(text, "en-GB"));
            round_trip(LiteralValue::typed(text, datatype.clone()));
        }
    }

    #[test]
    fn test_carriage_returns_are_normalized() {
        let decoded = decode(&encode("a\r\nb\rc", None, None)).unwrap();
        assert_eq!(decoded.text, "a\nb\nc");
    }

    #[test]
    fn test_datatype_alias_is_dropped() {
        let id = identifier_for("http://www.w3.org/2001/XMLSchema#date");
        let decoded = decode(&format!("\"2024-01-01\"^^[[{}|xsd:date]]", id)).unwrap();
        assert_eq!(decoded.datatype, Some(Reference::wikilink(id)));
    }

    #[test]
    fn test_block_form() {
        let decoded = decode("first line\nsecond \"line\"\n").unwrap();
        assert_eq!(decoded, LiteralValue::simple("first line\nsecond \"line\"\n"));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(decode(""), Err(LiteralError::Empty));
        assert!(matches!(decode("bare"), Err(LiteralError::Unquoted(_))));
        assert!(matches!(decode("\"open"), Err(LiteralError::Unterminated(_))));
        assert!(matches!(decode("\"esc\\"), Err(LiteralError::Unterminated(_))));
        assert_eq!(decode("\"x\\q\""), Err(LiteralError::UnknownEscape('q')));
        assert!(matches!(decode("\"x\"@"), Err(LiteralError::InvalidLanguage(_))));
        assert!(matches!(decode("\"x\"@en us"), Err(LiteralError::InvalidLanguage(_))));
        assert!(matches!(decode("\"x\"junk"), Err(LiteralError::UnrecognizedSuffix(_))));
        assert!(matches!(decode("\"x\"^^xsd:int"), Err(LiteralError::InvalidDatatype(_))));
        assert!(matches!(decode("\"x\"^^!xsd"), Err(LiteralError::InvalidDatatype(_))));
    }

    #[test]
    fn test_looks_like_literal() {
        assert!(looks_like_literal("\"x\"@en"));
        assert!(looks_like_literal("multi\nline"));
        assert!(!looks_like_literal("[[73b69787-81ea-563e-8e09-9c84cad4cf2b]]"));
        assert!(!looks_like_literal("<http://example.org/x>"));
    }
}
