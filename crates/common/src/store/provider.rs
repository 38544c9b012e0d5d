use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The keyspaces of the backing document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Per-path access control records, keyed by path
    Access,
    /// Registered credentials, keyed by alias
    Credentials,
    /// Data records, keyed by path
    Data,
}

/// A stored document: an id, a version counter, and an opaque body.
///
/// The version starts at 1 on first insert and increments on every
/// replacement; it exists so mutations can compare-and-swap instead of
/// blindly overwriting a concurrent update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub version: u64,
    pub body: serde_json::Value,
}

impl Document {
    /// Build a fresh (version 1) document from a serializable body.
    pub fn new<T: Serialize>(id: impl Into<String>, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: id.into(),
            version: 1,
            body: serde_json::to_value(body)?,
        })
    }

    /// Deserialize the body into a typed record.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Condition attached to a [`StoreProvider::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Unconditional upsert
    Any,
    /// The document must not already exist (write-once insert)
    Absent,
    /// The stored document must currently carry this version
    /// (optimistic concurrency for read-modify-write mutations)
    Version(u64),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError<T> {
    /// Unhandled provider error (connectivity, engine failure, ...)
    #[error("unhandled store provider error: {0}")]
    Provider(#[from] T),
    /// A conditional write found a different version (or presence)
    /// than expected
    #[error("version conflict on document {0}")]
    VersionConflict(String),
}

/// Narrow interface onto the backing document store.
///
/// Lookup is prefix-style on string ids: `get("users/abc")` returns
/// every document whose id starts with `users/abc`. Callers that need
/// decoded-segment semantics filter the result on their side; the
/// adapter itself stays opaque.
#[async_trait]
pub trait StoreProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send;

    /// Fetch all documents in `collection` whose id starts with `prefix`.
    async fn get(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<Document>, StoreError<Self::Error>>;

    /// Insert or replace a document, subject to `condition`.
    ///
    /// On success the stored version is the previous version plus one
    /// (or 1 for a first insert) and the resulting id is returned.
    ///
    /// # Errors
    ///
    /// * [`StoreError::VersionConflict`] - the condition did not hold
    /// * [`StoreError::Provider`] - the store itself failed
    async fn put(
        &self,
        collection: Collection,
        document: Document,
        condition: WriteCondition,
    ) -> Result<String, StoreError<Self::Error>>;

    /// Delete a document by exact id. Deleting an absent id is not an
    /// error.
    async fn delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<(), StoreError<Self::Error>>;

    /// Fetch the single document whose id equals `id`, if present.
    ///
    /// Default implementation filters the prefix lookup; providers with
    /// native point lookups can override.
    async fn get_exact(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError<Self::Error>> {
        let matches = self.get(collection, id).await?;
        Ok(matches.into_iter().find(|d| d.id == id))
    }
}
