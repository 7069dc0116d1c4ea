//! StrongRef: a record URI pinned to one exact version by its CID

use serde::{Deserialize, Serialize};

use crate::at_uri::AtUri;
use crate::content_id::ContentId;
use crate::error::{IdentifierKind, InvalidIdentifier, Result};

/// `{ "uri": "at://…", "cid": "bafy…" }`
///
/// Two refs are equal only when both the URI and the CID match, so a
/// reference to an edited record is a different reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StrongRefWire")]
pub struct StrongRef {
    uri: AtUri,
    cid: ContentId,
}

impl StrongRef {
    /// The URI must point at a single record.
    pub fn new(uri: AtUri, cid: ContentId) -> Result<Self> {
        if !uri.is_record() {
            return Err(InvalidIdentifier::new(
                IdentifierKind::StrongRef,
                uri.to_string(),
                "uri must reference a record",
            ));
        }
        Ok(Self { uri, cid })
    }

    pub fn parse(uri: &str, cid: &str) -> Result<Self> {
        Self::new(AtUri::parse(uri)?, ContentId::parse(cid)?)
    }

    pub fn uri(&self) -> &AtUri {
        &self.uri
    }

    pub fn cid(&self) -> &ContentId {
        &self.cid
    }
}

#[derive(Deserialize)]
struct StrongRefWire {
    uri: AtUri,
    cid: ContentId,
}

impl TryFrom<StrongRefWire> for StrongRef {
    type Error = InvalidIdentifier;

    fn try_from(wire: StrongRefWire) -> Result<Self> {
        Self::new(wire.uri, wire.cid)
    }
}
