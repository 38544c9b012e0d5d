//! Core data structures and cryptography for Gatehouse - an access
//! gateway in front of a distributed document store.
//!
//! This crate carries the domain logic consumed by the HTTP service:
//! - Ed25519 keys and signature verification ([`crypto`])
//! - Decoded, ordered-segment storage paths ([`path`])
//! - Content digests for write-once records ([`digest`])
//! - The persistence provider trait and in-memory provider ([`store`])
//! - The hierarchical ACL component ([`acl`])
//! - The content-addressed write gateway ([`gateway`])
//! - Credential registration and session tokens ([`accounts`], [`session`])
//! - The replication notification outbox ([`outbox`])

pub mod accounts;
pub mod acl;
pub mod crypto;
pub mod digest;
pub mod gateway;
pub mod outbox;
pub mod path;
pub mod session;
pub mod store;

pub mod prelude {
    pub use crate::accounts::{hash_password, Accounts, AccountsError, Credential};
    pub use crate::acl::{AccessRecord, Acl, AclError, GrantOutcome, KeyPattern, RevokeOutcome};
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::digest::PayloadDigest;
    pub use crate::gateway::{ContentGateway, DataRecord, GatewayError, WriteOutcome};
    pub use crate::outbox::{LogSink, NotificationSink, Outbox, OutboxDispatcher};
    pub use crate::path::{PathError, StorePath};
    pub use crate::session::{Claims, TokenError, TokenKind, TokenPair, TokenSigner};
    pub use crate::store::{
        Collection, Document, MemoryStoreProvider, StoreError, StoreProvider, WriteCondition,
    };
}
