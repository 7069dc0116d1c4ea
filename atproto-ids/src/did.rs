//! Decentralized identifiers (`did:<method>:<method-specific-id>`)

use std::fmt;

use crate::error::{IdentifierKind, InvalidIdentifier, Result};

const MAX_DID_LEN: usize = 2048;

/// A stable account identifier.
///
/// Compared by exact string equality; never normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Did {
    value: String,
    /// Byte offset of the colon separating method and method-specific id
    split: usize,
}

impl Did {
    /// Parse and validate a DID string.
    ///
    /// # Example
    ///
    /// ```
    /// use atproto_ids::Did;
    ///
    /// let did = Did::parse("did:plc:ewvi7nxzyoun6zhxrhs64oiz").unwrap();
    /// assert_eq!(did.method(), "plc");
    /// assert!(Did::parse("did::abc").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let fail = |reason: &str| InvalidIdentifier::new(IdentifierKind::Did, raw, reason);

        if raw.len() > MAX_DID_LEN {
            return Err(fail("longer than 2048 characters"));
        }
        let rest = raw
            .strip_prefix("did:")
            .ok_or_else(|| fail("missing \"did:\" prefix"))?;
        let (method, msid) = rest
            .split_once(':')
            .ok_or_else(|| fail("missing method-specific id"))?;

        if method.is_empty() {
            return Err(fail("empty method"));
        }
        if !method
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(fail("method must be lowercase alphanumeric"));
        }
        if msid.is_empty() {
            return Err(fail("empty method-specific id"));
        }
        validate_method_specific_id(msid).map_err(|reason| fail(reason))?;
        if method == "web" && msid.contains(':') {
            return Err(fail("did:web host must escape ':' as %3A"));
        }

        Ok(Self {
            value: raw.to_string(),
            split: "did:".len() + method.len(),
        })
    }

    /// The DID method, e.g. `plc` or `web`
    pub fn method(&self) -> &str {
        &self.value[4..self.split]
    }

    /// Everything after the method
    pub fn method_specific_id(&self) -> &str {
        &self.value[self.split + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

fn validate_method_specific_id(msid: &str) -> std::result::Result<(), &'static str> {
    let bytes = msid.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escaped = bytes.get(i + 1..i + 3).ok_or("truncated percent escape")?;
                if !escaped.iter().all(u8::is_ascii_hexdigit) {
                    return Err("invalid percent escape");
                }
                i += 3;
                continue;
            }
            b if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b':') => {}
            _ => return Err("invalid character in method-specific id"),
        }
        i += 1;
    }
    if msid.ends_with(':') {
        return Err("method-specific id may not end with ':'");
    }
    if msid.split(':').any(str::is_empty) {
        return Err("empty segment in method-specific id");
    }
    Ok(())
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

string_identifier!(Did);
