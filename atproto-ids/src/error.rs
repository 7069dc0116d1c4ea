//! Error types for identifier parsing

use std::fmt;
use thiserror::Error;

/// The identifier kinds this crate validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Did,
    Handle,
    AtIdentifier,
    Nsid,
    RecordKey,
    AtUri,
    Tid,
    Cid,
    StrongRef,
}

impl IdentifierKind {
    /// Lexicon string-format name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Did => "did",
            IdentifierKind::Handle => "handle",
            IdentifierKind::AtIdentifier => "at-identifier",
            IdentifierKind::Nsid => "nsid",
            IdentifierKind::RecordKey => "record-key",
            IdentifierKind::AtUri => "at-uri",
            IdentifierKind::Tid => "tid",
            IdentifierKind::Cid => "cid",
            IdentifierKind::StrongRef => "strong-ref",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw string failed validation for an identifier kind.
///
/// Always carries the offending input so callers can surface it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} {raw:?}: {reason}")]
pub struct InvalidIdentifier {
    kind: IdentifierKind,
    raw: String,
    reason: String,
}

impl InvalidIdentifier {
    /// Create a new validation error
    pub fn new(kind: IdentifierKind, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Which identifier kind was being parsed
    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// The rejected input
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Why the input was rejected
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Result type for identifier parsing
pub type Result<T> = std::result::Result<T, InvalidIdentifier>;
