//! Content digests for write-once records.
//!
//! Immutable records live under a path segment of the form
//! `sha256-<64 hex chars>`, the canonical encoding of the SHA-256
//! digest of the record's payload. The segment shape alone is what
//! distinguishes immutable from mutable paths.

use sha2::{Digest, Sha256};

/// Prefix of a canonical digest path segment.
pub const DIGEST_SEGMENT_PREFIX: &str = "sha256-";

/// Length of the hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 digest of a record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadDigest([u8; 32]);

impl PayloadDigest {
    /// Compute the digest of a payload.
    pub fn compute(payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Self(hasher.finalize().into())
    }

    /// Canonical path-segment encoding: `sha256-<lowercase hex>`.
    pub fn to_segment(&self) -> String {
        format!("{}{}", DIGEST_SEGMENT_PREFIX, hex::encode(self.0))
    }

    /// Whether this digest's canonical encoding equals the claimed
    /// (already percent-decoded) path segment.
    pub fn matches_segment(&self, segment: &str) -> bool {
        // Hex comparison is case-insensitive on the claimed side
        segment
            .strip_prefix(DIGEST_SEGMENT_PREFIX)
            .map(|claimed| claimed.eq_ignore_ascii_case(&hex::encode(self.0)))
            .unwrap_or(false)
    }
}

/// Whether a decoded path segment matches the digest-marker pattern.
///
/// This is a shape check only; it does not verify the digest against
/// any payload.
pub fn is_digest_segment(segment: &str) -> bool {
    match segment.strip_prefix(DIGEST_SEGMENT_PREFIX) {
        Some(rest) => {
            rest.len() == DIGEST_HEX_LEN && rest.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_compute_and_segment() {
        let digest = PayloadDigest::compute(b"hello");
        let segment = digest.to_segment();
        assert!(segment.starts_with("sha256-"));
        assert!(is_digest_segment(&segment));
        assert!(digest.matches_segment(&segment));
    }

    #[test]
    fn test_mismatch() {
        let digest = PayloadDigest::compute(b"hello");
        let other = PayloadDigest::compute(b"world");
        assert!(!digest.matches_segment(&other.to_segment()));
    }

    #[test]
    fn test_segment_shape() {
        assert!(!is_digest_segment("sha256-"));
        assert!(!is_digest_segment("sha256-zzzz"));
        assert!(!is_digest_segment("profile"));
        // wrong length
        assert!(!is_digest_segment("sha256-abcd"));
        // uppercase hex is still the digest shape
        let upper = format!("sha256-{}", "A".repeat(64));
        assert!(is_digest_segment(&upper));
    }
}
