//! The authority part of an AT-URI: either a DID or a handle

use std::fmt;

use crate::did::Did;
use crate::error::{IdentifierKind, InvalidIdentifier, Result};
use crate::handle::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtIdentifier {
    Did(Did),
    Handle(Handle),
}

impl AtIdentifier {
    /// Anything starting with `did:` must be a valid DID; everything else is
    /// parsed as a handle.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = if raw.starts_with("did:") {
            Did::parse(raw).map(Self::Did)
        } else {
            Handle::parse(raw).map(Self::Handle)
        };
        parsed.map_err(|err| {
            InvalidIdentifier::new(IdentifierKind::AtIdentifier, raw, err.reason())
        })
    }

    pub fn as_did(&self) -> Option<&Did> {
        match self {
            Self::Did(did) => Some(did),
            Self::Handle(_) => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Self::Did(_) => None,
            Self::Handle(handle) => Some(handle),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Did(did) => did.as_str(),
            Self::Handle(handle) => handle.as_str(),
        }
    }
}

impl From<Did> for AtIdentifier {
    fn from(did: Did) -> Self {
        Self::Did(did)
    }
}

impl From<Handle> for AtIdentifier {
    fn from(handle: Handle) -> Self {
        Self::Handle(handle)
    }
}

impl fmt::Display for AtIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

string_identifier!(AtIdentifier);
