//! Handles: DNS-name-shaped aliases for a DID

use std::fmt;

use crate::error::{IdentifierKind, InvalidIdentifier, Result};

const MAX_HANDLE_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Sentinel shown by services when a handle failed bidirectional verification.
pub const INVALID_HANDLE: &str = "handle.invalid";

/// A human-readable account alias, stored in canonical (lowercase) form.
///
/// The `handle.invalid` sentinel parses successfully and is reported by
/// [`Handle::is_invalid`], so "the service could not verify this handle" stays
/// distinct from "this string is not a handle".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Parse a handle, normalizing it to lowercase.
    ///
    /// # Example
    ///
    /// ```
    /// use atproto_ids::Handle;
    ///
    /// let handle = Handle::parse("Alice.Bsky.Social").unwrap();
    /// assert_eq!(handle.as_str(), "alice.bsky.social");
    /// assert!(Handle::parse("localhost").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        validate_domain(raw)
            .map_err(|reason| InvalidIdentifier::new(IdentifierKind::Handle, raw, reason))?;
        Ok(Self(raw.to_ascii_lowercase()))
    }

    /// The "handle unavailable/invalid" sentinel
    pub fn invalid() -> Self {
        Self(INVALID_HANDLE.to_string())
    }

    /// Whether this is the `handle.invalid` sentinel
    pub fn is_invalid(&self) -> bool {
        self.0 == INVALID_HANDLE
    }

    /// Top-level domain label
    pub fn tld(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Handles under the reserved `.test` TLD belong to test environments.
    pub fn is_test(&self) -> bool {
        self.tld() == "test"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// RFC-1123 hostname check shared with NSID authority validation.
pub(crate) fn validate_label(label: &str) -> std::result::Result<(), &'static str> {
    if label.is_empty() {
        return Err("empty label");
    }
    if label.len() > MAX_LABEL_LEN {
        return Err("label longer than 63 characters");
    }
    if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err("label may only contain letters, digits and hyphens");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("label may not start or end with a hyphen");
    }
    Ok(())
}

fn validate_domain(raw: &str) -> std::result::Result<(), &'static str> {
    if raw.is_empty() {
        return Err("empty handle");
    }
    if raw.len() > MAX_HANDLE_LEN {
        return Err("longer than 253 characters");
    }
    let labels: Vec<&str> = raw.split('.').collect();
    if labels.len() < 2 {
        return Err("must contain at least one dot");
    }
    for label in &labels {
        validate_label(label)?;
    }
    let tld = labels[labels.len() - 1];
    if tld.starts_with(|c: char| c.is_ascii_digit()) {
        return Err("top-level domain may not start with a digit");
    }
    Ok(())
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

string_identifier!(Handle);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        for raw in [
            "alice.bsky.social",
            "jay.bsky.team",
            "8.cn",
            "xn--ls8h.test",
            "a-b.example.com",
            "mod-authority.test",
        ] {
            let handle = Handle::parse(raw).unwrap();
            assert_eq!(handle.as_str(), raw);
        }
    }

    #[test]
    fn test_canonical_lowercase() {
        let handle = Handle::parse("ALICE.Example.COM").unwrap();
        assert_eq!(handle.to_string(), "alice.example.com");
        assert_eq!(Handle::parse(handle.as_str()).unwrap(), handle);
    }

    #[test]
    fn test_rejects_malformed() {
        let long_label = format!("{}.com", "a".repeat(64));
        let long_total = format!("{}.com", vec!["a".repeat(60); 5].join("."));
        for raw in [
            "",
            "localhost",
            ".com",
            "example.",
            "exa mple.com",
            "-alice.com",
            "alice-.com",
            "alice..com",
            "alice.123",
            "al_ice.com",
            long_label.as_str(),
            long_total.as_str(),
        ] {
            let err = Handle::parse(raw).unwrap_err();
            assert_eq!(err.kind(), IdentifierKind::Handle, "{raw}");
        }
    }

    #[test]
    fn test_invalid_sentinel_is_a_state() {
        let parsed = Handle::parse("handle.invalid").unwrap();
        assert!(parsed.is_invalid());
        assert_eq!(parsed, Handle::invalid());
        assert!(!Handle::parse("alice.test").unwrap().is_invalid());
    }

    #[test]
    fn test_tld_and_test_detection() {
        let handle = Handle::parse("carla.test").unwrap();
        assert_eq!(handle.tld(), "test");
        assert!(handle.is_test());
        assert!(!Handle::parse("carla.social").unwrap().is_test());
    }
}
