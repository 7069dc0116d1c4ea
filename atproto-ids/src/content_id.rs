//! Content identifiers (CIDv1) restricted to the codecs and hashes atproto uses

use std::fmt;

use cid::multihash::Multihash;
use cid::{Cid, Version};
use multihash_codetable::{Code, MultihashDigest};

use crate::error::{IdentifierKind, InvalidIdentifier, Result};

/// Content codec of the addressed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Opaque bytes, used for blobs (0x55)
    Raw,
    /// DAG-CBOR, used for records (0x71)
    DagCbor,
}

impl Codec {
    pub fn code(&self) -> u64 {
        match self {
            Codec::Raw => 0x55,
            Codec::DagCbor => 0x71,
        }
    }

    fn from_code(code: u64) -> Option<Self> {
        match code {
            0x55 => Some(Codec::Raw),
            0x71 => Some(Codec::DagCbor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha2_256,
    Sha2_512,
}

impl HashAlgorithm {
    /// Multicodec code of the hash function
    pub fn code(&self) -> u64 {
        match self {
            HashAlgorithm::Sha2_256 => 0x12,
            HashAlgorithm::Sha2_512 => 0x13,
        }
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha2_256 => 32,
            HashAlgorithm::Sha2_512 => 64,
        }
    }

    fn from_code(code: u64) -> Option<Self> {
        match code {
            0x12 => Some(HashAlgorithm::Sha2_256),
            0x13 => Some(HashAlgorithm::Sha2_512),
            _ => None,
        }
    }

    fn table_code(&self) -> Code {
        match self {
            HashAlgorithm::Sha2_256 => Code::Sha2_256,
            HashAlgorithm::Sha2_512 => Code::Sha2_512,
        }
    }
}

/// A self-describing content hash.
///
/// Only CIDv1 with the codecs in [`Codec`] and hashes in [`HashAlgorithm`]
/// is representable. The canonical string form is multibase base32-lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId {
    inner: Cid,
    codec: Codec,
    hash: HashAlgorithm,
}

impl ContentId {
    /// Wrap an existing digest; fails when its length does not match `hash`.
    pub fn from_digest(codec: Codec, hash: HashAlgorithm, digest: &[u8]) -> Result<Self> {
        let preview = hex_preview(digest);
        let fail = |reason: String| {
            InvalidIdentifier::new(IdentifierKind::Cid, preview.as_str(), reason)
        };

        if digest.len() != hash.digest_len() {
            return Err(fail(format!(
                "{:?} digest must be {} bytes, got {}",
                hash,
                hash.digest_len(),
                digest.len()
            )));
        }
        let multihash =
            Multihash::<64>::wrap(hash.code(), digest).map_err(|e| fail(e.to_string()))?;
        Ok(Self {
            inner: Cid::new_v1(codec.code(), multihash),
            codec,
            hash,
        })
    }

    /// Hash `bytes` with sha2-256 and address them under `codec`.
    ///
    /// ```
    /// use atproto_ids::{Codec, ContentId};
    ///
    /// let cid = ContentId::compute(Codec::Raw, b"hello");
    /// assert!(cid.to_string().starts_with("bafkrei"));
    /// ```
    pub fn compute(codec: Codec, bytes: &[u8]) -> Self {
        Self::compute_with(codec, HashAlgorithm::Sha2_256, bytes)
    }

    pub fn compute_with(codec: Codec, hash: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            inner: Cid::new_v1(codec.code(), hash.table_code().digest(bytes)),
            codec,
            hash,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let fail = |reason: String| InvalidIdentifier::new(IdentifierKind::Cid, raw, reason);

        let inner = Cid::try_from(raw).map_err(|e| fail(format!("not a CID: {e}")))?;
        if inner.version() != Version::V1 {
            return Err(fail("only CIDv1 is supported".to_string()));
        }
        let codec = Codec::from_code(inner.codec())
            .ok_or_else(|| fail(format!("unsupported codec 0x{:x}", inner.codec())))?;
        let hash = HashAlgorithm::from_code(inner.hash().code())
            .ok_or_else(|| fail(format!("unsupported hash 0x{:x}", inner.hash().code())))?;
        if inner.hash().digest().len() != hash.digest_len() {
            return Err(fail(format!(
                "{:?} digest must be {} bytes, got {}",
                hash,
                hash.digest_len(),
                inner.hash().digest().len()
            )));
        }
        Ok(Self { inner, codec, hash })
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn digest(&self) -> &[u8] {
        self.inner.hash().digest()
    }

    /// Whether `bytes` hash to this identifier.
    pub fn verify(&self, bytes: &[u8]) -> bool {
        self.hash.table_code().digest(bytes).digest() == self.digest()
    }
}

fn hex_preview(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

string_identifier!(ContentId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_and_parse() {
        let cid = ContentId::compute(Codec::Raw, b"Hello, atproto!");
        let rendered = cid.to_string();
        assert!(rendered.starts_with('b'));

        let parsed = ContentId::parse(&rendered).unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(parsed.codec(), Codec::Raw);
        assert_eq!(parsed.hash(), HashAlgorithm::Sha2_256);
        assert_eq!(parsed.digest().len(), 32);
        assert!(parsed.verify(b"Hello, atproto!"));
        assert!(!parsed.verify(b"something else"));
    }

    #[test]
    fn test_from_digest_matches_compute() {
        let computed = ContentId::compute(Codec::DagCbor, b"record bytes");
        let wrapped =
            ContentId::from_digest(Codec::DagCbor, HashAlgorithm::Sha2_256, computed.digest())
                .unwrap();
        assert_eq!(wrapped, computed);
        assert!(computed.to_string().starts_with("bafyrei"));
    }

    #[test]
    fn test_digest_length_checked() {
        let err =
            ContentId::from_digest(Codec::Raw, HashAlgorithm::Sha2_256, &[0u8; 31]).unwrap_err();
        assert_eq!(err.kind(), IdentifierKind::Cid);
        assert!(ContentId::from_digest(Codec::Raw, HashAlgorithm::Sha2_512, &[0u8; 32]).is_err());
        assert!(ContentId::from_digest(Codec::Raw, HashAlgorithm::Sha2_512, &[0u8; 64]).is_ok());
    }

    #[test]
    fn test_sha512_round_trip() {
        let cid = ContentId::compute_with(Codec::Raw, HashAlgorithm::Sha2_512, b"blob");
        assert_eq!(cid.digest().len(), 64);
        assert_eq!(ContentId::parse(&cid.to_string()).unwrap(), cid);
    }

    #[test]
    fn test_rejects_unsupported() {
        // CIDv0 (dag-pb, base58)
        assert!(ContentId::parse("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").is_err());
        // dag-pb codec in a v1 CID
        let dag_pb = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";
        assert!(ContentId::parse(dag_pb).is_err());
        for raw in ["", "b", "not-a-cid", "bafkrei"] {
            assert_eq!(ContentId::parse(raw).unwrap_err().kind(), IdentifierKind::Cid, "{raw}");
        }
    }
}
