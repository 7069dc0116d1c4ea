//! Record keys: the last path segment of a record-level AT-URI

use std::fmt;

use crate::error::{IdentifierKind, InvalidIdentifier, Result};
use crate::tid::Tid;

const MAX_RKEY_LEN: usize = 512;

/// An opaque record key within a collection.
///
/// Most records are keyed by a [`Tid`]; some collections use fixed keys such
/// as `self`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let fail = |reason: &str| InvalidIdentifier::new(IdentifierKind::RecordKey, raw, reason);

        if raw.is_empty() {
            return Err(fail("empty record key"));
        }
        if raw.len() > MAX_RKEY_LEN {
            return Err(fail("longer than 512 characters"));
        }
        if raw == "." || raw == ".." {
            return Err(fail("\".\" and \"..\" are reserved"));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b':' | b'~' | b'-'))
        {
            return Err(fail("invalid character"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Interpret this key as a TID, if it is one.
    pub fn as_tid(&self) -> Option<Tid> {
        Tid::parse(&self.0).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Tid> for RecordKey {
    fn from(tid: Tid) -> Self {
        Self(tid.to_string())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

string_identifier!(RecordKey);
