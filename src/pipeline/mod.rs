//! Batch pipelines over the record store
//!
//! Every pipeline reads the world, then writes the world. Per-item failures
//! (a bad triple, an unparseable record, a collision) are collected as
//! [`ItemError`]s and reported at the end; only conditions that make the
//! whole run meaningless are returned as `Err`.

mod export;
mod import;
mod relink;
mod validate;
mod verify;

use crate::record::StoreError;
use serde::Serialize;
use std::fmt;
use tracing::warn;

pub use export::{export, export_to_string, ExportError, ExportResult, ExportStats};
pub use import::{import, ImportError, ImportOptions, ImportScope, ImportStats};
pub use relink::{relink, RelinkStats};
pub use validate::{validate, Issue, IssueKind, Severity, ValidationReport, ValidationStats};
pub use verify::{verify, VerifyError, VerifyOptions, VerifyReport};

/// A failure tied to one item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// File and field, or source triple
    pub location: String,
    pub message: String,
}

impl ItemError {
    pub fn new(location: impl Into<String>, message: impl fmt::Display) -> Self {
        let error = Self {
            location: location.into(),
            message: message.to_string(),
        };
        warn!("{}", error);
        error
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Split store errors into per-item ones and those that end the run
pub(crate) fn item_error(location: impl Into<String>, error: StoreError) -> Result<ItemError, StoreError> {
    match error {
        StoreError::Collision { .. } | StoreError::Record { .. } | StoreError::NotFound(_) => {
            Ok(ItemError::new(location, error))
        }
        fatal => Err(fatal),
    }
}

/// Keep a triple unless it carries a language tag outside the allowed set
pub(crate) fn language_allowed(languages: &[String], language: Option<&str>) -> bool {
    match language {
        Some(tag) if !languages.is_empty() => languages.iter().any(|l| l.eq_ignore_ascii_case(tag)),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_allowed() {
        let langs = vec!["en".to_string(), "ru".to_string()];
        assert!(language_allowed(&langs, None));
        assert!(language_allowed(&langs, Some("EN")));
        assert!(!language_allowed(&langs, Some("de")));
        assert!(language_allowed(&[], Some("de")));
    }

    #[test]
    fn test_item_error_display() {
        let error = ItemError::new("ex/abc.md:object", "Unresolved reference [[x]]");
        assert_eq!(error.to_string(), "ex/abc.md:object: Unresolved reference [[x]]");
    }
}
