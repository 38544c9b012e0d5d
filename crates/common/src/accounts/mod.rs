//! Credential registration and authentication.
//!
//! Registration creates two documents: the credential (keyed by alias)
//! and the subject's self-owned access record at `users/<public key>`.
//! Cross-document transactions are out of scope for the adapter, so
//! the pair is written credential-first; a failure in between surfaces
//! to the caller, who re-registers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::acl::AccessRecord;
use crate::crypto::PublicKey;
use crate::outbox::OutboxDispatcher;
use crate::path::USER_NAMESPACE;
use crate::store::{Collection, Document, StoreError, StoreProvider, WriteCondition};

#[derive(Debug, thiserror::Error)]
pub enum AccountsError<E: std::fmt::Display + std::fmt::Debug> {
    /// The alias is already registered
    #[error("alias {0} is already registered")]
    AliasTaken(String),
    /// No credential exists for the alias
    #[error("no credential for alias {0}")]
    NotFound(String),
    /// The supplied password does not match the stored hash
    #[error("password mismatch")]
    BadPassword,
    /// A stored credential failed to deserialize
    #[error("corrupt credential for {0}: {1}")]
    Corrupt(String, serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError<E>),
}

/// A registered identity: alias, public key, and password hash.
/// Created at registration and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub alias: String,
    pub public_key: PublicKey,
    pub password_hash: String,
}

/// Hash a password the way stored credentials expect: lowercase hex
/// SHA-256.
pub fn hash_password(pass: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass.as_bytes());
    hex::encode(hasher.finalize())
}

/// Credential store and authentication checks.
#[derive(Debug, Clone)]
pub struct Accounts<P: StoreProvider> {
    provider: P,
    outbox: OutboxDispatcher,
}

impl<P: StoreProvider> Accounts<P> {
    pub fn new(provider: P, outbox: OutboxDispatcher) -> Self {
        Self { provider, outbox }
    }

    /// Register a new identity: the credential plus the self-owned
    /// access record at `users/<public key>` (owner and sole allowed
    /// entry both the subject's key).
    pub async fn register(
        &self,
        alias: &str,
        public_key: PublicKey,
        password_hash: &str,
    ) -> Result<Credential, AccountsError<P::Error>> {
        let credential = Credential {
            alias: alias.to_string(),
            public_key,
            password_hash: password_hash.to_string(),
        };
        let doc = Document::new(alias, &credential)
            .map_err(|e| AccountsError::Corrupt(alias.to_string(), e))?;
        match self
            .provider
            .put(Collection::Credentials, doc, WriteCondition::Absent)
            .await
        {
            Ok(_) => {}
            Err(StoreError::VersionConflict(_)) => {
                // An identical credential means a retry of a partial
                // registration; let it fall through and complete the
                // access-record side
                let existing = self.lookup(alias).await?;
                if existing != credential {
                    return Err(AccountsError::AliasTaken(alias.to_string()));
                }
            }
            Err(e) => return Err(e.into()),
        }

        // Self-owned access record, write-once: a retry after a
        // partial failure completes the pair, but an existing record
        // keeps whatever grants it has accumulated
        let record_id = format!("{}/{}", USER_NAMESPACE, public_key);
        let record = AccessRecord::self_owned(public_key);
        let doc = Document::new(record_id.clone(), &record)
            .map_err(|e| AccountsError::Corrupt(record_id.clone(), e))?;
        match self
            .provider
            .put(Collection::Access, doc, WriteCondition::Absent)
            .await
        {
            Ok(stored) => self.outbox.dispatch(stored),
            Err(StoreError::VersionConflict(_)) => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(alias, key = %public_key, "registered");
        Ok(credential)
    }

    /// Authenticate an alias with a plaintext password, checked
    /// against the stored hash.
    pub async fn authenticate(
        &self,
        alias: &str,
        pass: &str,
    ) -> Result<Credential, AccountsError<P::Error>> {
        let credential = self.lookup(alias).await?;
        if !credential
            .password_hash
            .eq_ignore_ascii_case(&hash_password(pass))
        {
            return Err(AccountsError::BadPassword);
        }
        Ok(credential)
    }

    /// Fetch the credential for an alias.
    pub async fn lookup(&self, alias: &str) -> Result<Credential, AccountsError<P::Error>> {
        let doc = self
            .provider
            .get_exact(Collection::Credentials, alias)
            .await?
            .ok_or_else(|| AccountsError::NotFound(alias.to_string()))?;
        doc.decode()
            .map_err(|e| AccountsError::Corrupt(alias.to_string(), e))
    }

    /// Whether an access record exists for the alias's subject, i.e.
    /// registration completed through to the ACL side.
    pub async fn acl_exists(&self, alias: &str) -> Result<bool, AccountsError<P::Error>> {
        let credential = match self.lookup(alias).await {
            Ok(c) => c,
            Err(AccountsError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let record_id = format!("{}/{}", USER_NAMESPACE, credential.public_key);
        Ok(self
            .provider
            .get_exact(Collection::Access, &record_id)
            .await?
            .is_some())
    }
}
