//! AT Protocol identifiers
//!
//! Validated, canonicalized value types for every identifier that crosses
//! the protocol boundary:
//!
//! - [`Did`] - stable account identifiers
//! - [`Handle`] - DNS-shaped account aliases
//! - [`Nsid`] - method and collection names
//! - [`AtUri`] - repository, collection and record references
//! - [`Tid`] / [`TidGenerator`] - sortable timestamp record keys
//! - [`ContentId`] - CIDv1 content hashes
//! - [`StrongRef`] - a record URI pinned to a CID
//!
//! Every type parses from and renders to its canonical string form, and
//! serializes as that string. Parsing never panics; failures carry the
//! offending input in [`InvalidIdentifier`].

#[macro_use]
mod macros;

pub mod at_identifier;
pub mod at_uri;
pub mod content_id;
pub mod did;
pub mod error;
pub mod handle;
pub mod nsid;
pub mod record_key;
pub mod strong_ref;
pub mod tid;

pub use at_identifier::AtIdentifier;
pub use at_uri::{AtUri, UriLevel};
pub use content_id::{Codec, ContentId, HashAlgorithm};
pub use did::Did;
pub use error::{IdentifierKind, InvalidIdentifier, Result};
pub use handle::{Handle, INVALID_HANDLE};
pub use nsid::Nsid;
pub use record_key::RecordKey;
pub use strong_ref::StrongRef;
pub use tid::{Clock, ManualClock, SystemClock, Tid, TidGenerator};
