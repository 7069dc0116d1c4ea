//! The `atproto-accept-labelers` request header

use std::fmt;

use atproto_ids::Did;

/// Header naming the labelers whose labels the caller wants hydrated.
pub const ACCEPT_LABELERS_HEADER: &str = "atproto-accept-labelers";

/// Services honour at most this many labelers per request.
pub const MAX_LABELERS: usize = 20;

/// Ordered, deduplicated set of labeler DIDs for the accept-labelers header.
///
/// A `redact` entry asks the service to strip content those labels hide
/// rather than just annotate it.
///
/// ```
/// use atproto_ids::Did;
/// use atproto_xrpc::AcceptLabelers;
///
/// let mut labelers = AcceptLabelers::new();
/// labelers.push(Did::parse("did:plc:a").unwrap(), true);
/// labelers.push(Did::parse("did:plc:b").unwrap(), false);
/// assert_eq!(labelers.header_value(), "did:plc:a;redact, did:plc:b");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptLabelers {
    entries: Vec<(Did, bool)>,
}

impl AcceptLabelers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from DIDs that all share the same redact flag.
    pub fn from_dids<'a>(dids: impl IntoIterator<Item = &'a Did>, redact: bool) -> Self {
        let mut labelers = Self::new();
        for did in dids {
            labelers.push(did.clone(), redact);
        }
        labelers
    }

    /// Append a labeler. Returns `false` when it was already present or the
    /// set is full.
    pub fn push(&mut self, did: Did, redact: bool) -> bool {
        if self.entries.len() >= MAX_LABELERS || self.contains(&did) {
            return false;
        }
        self.entries.push((did, redact));
        true
    }

    pub fn contains(&self, did: &Did) -> bool {
        self.entries.iter().any(|(existing, _)| existing == did)
    }

    pub fn dids(&self) -> impl Iterator<Item = &Did> {
        self.entries.iter().map(|(did, _)| did)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AcceptLabelers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (did, redact)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{did}")?;
            if *redact {
                f.write_str(";redact")?;
            }
        }
        Ok(())
    }
}
