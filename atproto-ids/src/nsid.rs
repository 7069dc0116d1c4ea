//! Namespaced identifiers (reverse-domain names such as `app.bsky.feed.post`)

use std::fmt;

use crate::error::{IdentifierKind, InvalidIdentifier, Result};
use crate::handle::validate_label;

const MAX_NSID_LEN: usize = 317;
const MAX_NAME_LEN: usize = 63;

/// A namespaced identifier: XRPC method names and record collections.
///
/// The domain authority is case-insensitive and stored lowercase; the final
/// name segment is case-sensitive and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nsid {
    value: String,
    /// Byte offset of the last '.'
    name_start: usize,
}

impl Nsid {
    /// Parse and canonicalize an NSID.
    ///
    /// ```
    /// use atproto_ids::Nsid;
    ///
    /// let nsid = Nsid::parse("com.atproto.repo.getRecord").unwrap();
    /// assert_eq!(nsid.authority(), "com.atproto.repo");
    /// assert_eq!(nsid.name(), "getRecord");
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let fail = |reason: &str| InvalidIdentifier::new(IdentifierKind::Nsid, raw, reason);

        if raw.len() > MAX_NSID_LEN {
            return Err(fail("longer than 317 characters"));
        }
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() < 3 {
            return Err(fail("needs at least three segments"));
        }

        let (name, authority) = segments
            .split_last()
            .ok_or_else(|| fail("needs at least three segments"))?;
        for segment in authority {
            validate_label(segment).map_err(|reason| fail(reason))?;
        }
        if authority[0].starts_with(|c: char| c.is_ascii_digit()) {
            return Err(fail("first segment may not start with a digit"));
        }
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(fail("name segment must be 1-63 characters"));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic())
            || !name.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(fail("name segment must be alphanumeric, starting with a letter"));
        }

        let authority = authority.join(".").to_ascii_lowercase();
        let name_start = authority.len();
        Ok(Self {
            value: format!("{authority}.{name}"),
            name_start,
        })
    }

    /// The reversed domain part, e.g. `app.bsky.feed`
    pub fn authority(&self) -> &str {
        &self.value[..self.name_start]
    }

    /// The final segment, e.g. `post`
    pub fn name(&self) -> &str {
        &self.value[self.name_start + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Nsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for Nsid {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

string_identifier!(Nsid);
