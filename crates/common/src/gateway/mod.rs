//! Content-addressed write gateway.
//!
//! Data records are mutable or immutable by path shape alone: a path
//! containing a digest-marker segment (`sha256-<hex>`) is immutable,
//! hash-verified, and write-once; everything else is freely
//! overwritable. The shape check always runs before any store lookup,
//! so the immutability guard holds even for ids that do not exist yet.

use serde::{Deserialize, Serialize};

use crate::digest::PayloadDigest;
use crate::outbox::OutboxDispatcher;
use crate::path::StorePath;
use crate::store::{Collection, Document, StoreError, StoreProvider, WriteCondition};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError<E: std::fmt::Display + std::fmt::Debug> {
    /// The computed payload digest does not match the claimed segment
    #[error("payload digest {computed} does not match claimed segment {claimed}")]
    DigestMismatch { claimed: String, computed: String },
    /// A record already exists at an immutable id
    #[error("immutable record already exists at {0}")]
    AlreadyExists(String),
    /// Deletion was attempted under the digest-marker pattern
    #[error("cannot delete immutable path {0}")]
    ImmutablePath(String),
    /// An immutable write whose digest segment leads the path has no
    /// base to anchor to
    #[error("digest segment without a base path in {0}")]
    MissingBase(String),
    #[error(transparent)]
    Store(#[from] StoreError<E>),
}

/// A data record as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub path: String,
    pub payload: serde_json::Value,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Stored document id (canonical digest id for immutable writes)
    pub id: String,
    /// Whether the record was stored write-once
    pub immutable: bool,
}

/// The content-addressed gateway over the data collection.
#[derive(Debug, Clone)]
pub struct ContentGateway<P: StoreProvider> {
    provider: P,
    outbox: OutboxDispatcher,
}

impl<P: StoreProvider> ContentGateway<P> {
    pub fn new(provider: P, outbox: OutboxDispatcher) -> Self {
        Self { provider, outbox }
    }

    /// Write a payload, routing on path shape: a digest-marker segment
    /// selects the verified write-once path, its absence the mutable
    /// upsert path.
    pub async fn write(
        &self,
        path: &StorePath,
        payload: serde_json::Value,
    ) -> Result<WriteOutcome, GatewayError<P::Error>> {
        if path.has_digest_segment() {
            self.write_immutable(path, payload).await
        } else {
            self.write_mutable(path, payload).await
        }
    }

    /// Upsert a record at id = path, overwriting any prior value.
    pub async fn write_mutable(
        &self,
        path: &StorePath,
        payload: serde_json::Value,
    ) -> Result<WriteOutcome, GatewayError<P::Error>> {
        let id = path.to_string();
        let doc = Document::new(id.clone(), &payload).expect("serde_json::Value serializes");
        let stored = self
            .provider
            .put(Collection::Data, doc, WriteCondition::Any)
            .await?;
        self.outbox.dispatch(stored.clone());
        tracing::debug!(id = %stored, "mutable write");
        Ok(WriteOutcome {
            id: stored,
            immutable: false,
        })
    }

    /// Verify and insert a write-once record.
    ///
    /// The payload's SHA-256 digest must match the (already decoded)
    /// claimed digest segment; on mismatch nothing is persisted. The
    /// canonical id is `base/segment/` regardless of any remainder
    /// beyond the digest segment. An existing record at that id is
    /// never overwritten.
    pub async fn write_immutable(
        &self,
        path: &StorePath,
        payload: serde_json::Value,
    ) -> Result<WriteOutcome, GatewayError<P::Error>> {
        let (base, claimed) = path
            .split_at_digest()
            .ok_or_else(|| GatewayError::MissingBase(path.to_string()))?;

        let digest = PayloadDigest::compute(&payload_bytes(&payload));
        if !digest.matches_segment(claimed) {
            return Err(GatewayError::DigestMismatch {
                claimed: claimed.to_string(),
                computed: digest.to_segment(),
            });
        }

        let id = format!("{}/{}/", base, claimed);
        if self
            .provider
            .get_exact(Collection::Data, &id)
            .await?
            .is_some()
        {
            return Err(GatewayError::AlreadyExists(id));
        }

        let doc = Document::new(id.clone(), &payload).expect("serde_json::Value serializes");
        let stored = match self
            .provider
            .put(Collection::Data, doc, WriteCondition::Absent)
            .await
        {
            Ok(stored) => stored,
            // Lost a race with an identical write; same outcome as the
            // lookup catching it
            Err(StoreError::VersionConflict(id)) => return Err(GatewayError::AlreadyExists(id)),
            Err(e) => return Err(e.into()),
        };
        self.outbox.dispatch(stored.clone());
        tracing::debug!(id = %stored, "immutable write");
        Ok(WriteOutcome {
            id: stored,
            immutable: true,
        })
    }

    /// Delete every data record under `prefix`, reporting the deleted
    /// ids. An empty match set is success, not an error.
    ///
    /// Rejected outright when the prefix falls under the digest-marker
    /// pattern - the guard is on path shape, before any lookup.
    pub async fn delete_mutable(
        &self,
        prefix: &StorePath,
    ) -> Result<Vec<String>, GatewayError<P::Error>> {
        if prefix.has_digest_segment() {
            return Err(GatewayError::ImmutablePath(prefix.to_string()));
        }

        let matches = self.matching(prefix).await?;
        let mut deleted = Vec::with_capacity(matches.len());
        for doc in matches {
            self.provider.delete(Collection::Data, &doc.id).await?;
            self.outbox.dispatch(doc.id.clone());
            deleted.push(doc.id);
        }
        tracing::debug!(prefix = %prefix, count = deleted.len(), "deleted records");
        Ok(deleted)
    }

    /// Fetch all data records under `path`.
    pub async fn fetch(&self, path: &StorePath) -> Result<Vec<DataRecord>, GatewayError<P::Error>> {
        let matches = self.matching(path).await?;
        Ok(matches
            .into_iter()
            .map(|doc| DataRecord {
                path: doc.id,
                payload: doc.body,
            })
            .collect())
    }

    /// Prefix lookup filtered to segment-wise matches, so `users/abc`
    /// never matches `users/abcd`.
    async fn matching(&self, prefix: &StorePath) -> Result<Vec<Document>, GatewayError<P::Error>> {
        let raw = self.provider.get(Collection::Data, &prefix.to_string()).await?;
        Ok(raw
            .into_iter()
            .filter(|doc| match StorePath::parse(&doc.id) {
                Ok(path) => prefix.is_prefix_of(&path),
                Err(_) => false,
            })
            .collect())
    }
}

/// Bytes the content digest covers: the raw string for string payloads
/// (so `hash("hello")` addresses the payload `"hello"`), compact JSON
/// for anything structured.
pub fn payload_bytes(payload: &serde_json::Value) -> Vec<u8> {
    match payload {
        serde_json::Value::String(s) => s.as_bytes().to_vec(),
        other => serde_json::to_vec(other).expect("serde_json::Value serializes"),
    }
}
