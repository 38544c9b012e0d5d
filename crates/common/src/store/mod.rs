//! Persistence adapter for the backing document store.
//!
//! The real store is an external collaborator; everything here talks to
//! it through the narrow [`StoreProvider`] interface (prefix get, put,
//! delete). An in-memory provider ships for tests and single-node use.

mod memory;
mod provider;

pub use memory::{MemoryStoreProvider, MemoryStoreProviderError};
pub use provider::{Collection, Document, StoreError, StoreProvider, WriteCondition};
