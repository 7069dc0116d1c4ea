//! AT-URIs: `at://<authority>[/<collection>[/<rkey>]]`

use std::fmt;

use crate::at_identifier::AtIdentifier;
use crate::error::{IdentifierKind, InvalidIdentifier, Result};
use crate::nsid::Nsid;
use crate::record_key::RecordKey;

const SCHEME: &str = "at://";
const MAX_URI_LEN: usize = 8192;

/// How deep into a repository an [`AtUri`] points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UriLevel {
    Repository,
    Collection,
    Record,
}

/// A reference to a repository, a collection in it, or a single record.
///
/// Query strings and fragments are not accepted. A record key is only
/// present together with a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtUri {
    authority: AtIdentifier,
    collection: Option<Nsid>,
    rkey: Option<RecordKey>,
}

impl AtUri {
    /// Parse and canonicalize an AT-URI.
    ///
    /// ```
    /// use atproto_ids::{AtUri, UriLevel};
    ///
    /// let uri = AtUri::parse("at://did:plc:alice/app.bsky.feed.post/3jzfcijpj2z2a").unwrap();
    /// assert_eq!(uri.level(), UriLevel::Record);
    /// assert_eq!(uri.rkey().map(|k| k.as_str()), Some("3jzfcijpj2z2a"));
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let fail = |reason: &str| InvalidIdentifier::new(IdentifierKind::AtUri, raw, reason);

        if raw.len() > MAX_URI_LEN {
            return Err(fail("longer than 8192 characters"));
        }
        let rest = raw
            .strip_prefix(SCHEME)
            .ok_or_else(|| fail("missing \"at://\" scheme"))?;
        if rest.contains(['?', '#']) {
            return Err(fail("query and fragment are not supported"));
        }

        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() > 3 {
            return Err(fail("too many path segments"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(fail("empty path segment"));
        }

        let authority = AtIdentifier::parse(segments[0]).map_err(|err| fail(err.reason()))?;
        let collection = segments
            .get(1)
            .map(|s| Nsid::parse(s))
            .transpose()
            .map_err(|err| fail(err.reason()))?;
        let rkey = segments
            .get(2)
            .map(|s| RecordKey::parse(s))
            .transpose()
            .map_err(|err| fail(err.reason()))?;

        Ok(Self {
            authority,
            collection,
            rkey,
        })
    }

    pub fn repository(authority: impl Into<AtIdentifier>) -> Self {
        Self {
            authority: authority.into(),
            collection: None,
            rkey: None,
        }
    }

    pub fn collection(authority: impl Into<AtIdentifier>, collection: Nsid) -> Self {
        Self {
            authority: authority.into(),
            collection: Some(collection),
            rkey: None,
        }
    }

    pub fn record(authority: impl Into<AtIdentifier>, collection: Nsid, rkey: RecordKey) -> Self {
        Self {
            authority: authority.into(),
            collection: Some(collection),
            rkey: Some(rkey),
        }
    }

    pub fn authority(&self) -> &AtIdentifier {
        &self.authority
    }

    pub fn collection_nsid(&self) -> Option<&Nsid> {
        self.collection.as_ref()
    }

    pub fn rkey(&self) -> Option<&RecordKey> {
        self.rkey.as_ref()
    }

    pub fn level(&self) -> UriLevel {
        match (&self.collection, &self.rkey) {
            (None, _) => UriLevel::Repository,
            (Some(_), None) => UriLevel::Collection,
            (Some(_), Some(_)) => UriLevel::Record,
        }
    }

    pub fn is_record(&self) -> bool {
        self.level() == UriLevel::Record
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}", self.authority)?;
        if let Some(collection) = &self.collection {
            write!(f, "/{collection}")?;
            if let Some(rkey) = &self.rkey {
                write!(f, "/{rkey}")?;
            }
        }
        Ok(())
    }
}

string_identifier!(AtUri);
