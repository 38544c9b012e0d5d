use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::provider::{Collection, Document, StoreError, StoreProvider, WriteCondition};

/// In-memory store provider backed by ordered maps.
///
/// One `BTreeMap` per collection so prefix lookups are range scans.
/// Suitable for tests and single-node deployments; the production
/// adapter fronts the real replicated store.
#[derive(Debug, Clone)]
pub struct MemoryStoreProvider {
    inner: Arc<RwLock<MemoryStoreProviderInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreProviderInner {
    collections: HashMap<Collection, BTreeMap<String, Document>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreProviderError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreProviderInner::default())),
        }
    }
}

impl Default for MemoryStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreProvider for MemoryStoreProvider {
    type Error = MemoryStoreProviderError;

    async fn get(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<Document>, StoreError<Self::Error>> {
        let inner = self.inner.read().map_err(|e| {
            StoreError::Provider(MemoryStoreProviderError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })?;

        let Some(map) = inner.collections.get(&collection) else {
            return Ok(Vec::new());
        };

        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn put(
        &self,
        collection: Collection,
        mut document: Document,
        condition: WriteCondition,
    ) -> Result<String, StoreError<Self::Error>> {
        let mut inner = self.inner.write().map_err(|e| {
            StoreError::Provider(MemoryStoreProviderError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })?;

        let map = inner.collections.entry(collection).or_default();
        let current = map.get(&document.id);

        match (condition, current) {
            (WriteCondition::Absent, Some(_)) => {
                return Err(StoreError::VersionConflict(document.id));
            }
            (WriteCondition::Version(expected), stored) => {
                let stored_version = stored.map(|d| d.version);
                if stored_version != Some(expected) {
                    return Err(StoreError::VersionConflict(document.id));
                }
            }
            _ => {}
        }

        document.version = current.map(|d| d.version + 1).unwrap_or(1);
        let id = document.id.clone();
        map.insert(id.clone(), document);
        Ok(id)
    }

    async fn delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<(), StoreError<Self::Error>> {
        let mut inner = self.inner.write().map_err(|e| {
            StoreError::Provider(MemoryStoreProviderError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })?;

        if let Some(map) = inner.collections.get_mut(&collection) {
            map.remove(id);
        }
        Ok(())
    }
}
