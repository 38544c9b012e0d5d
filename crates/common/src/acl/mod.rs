//! Hierarchical, signature-authorized access control.
//!
//! Write permission inside the `users` namespace resolves by ancestor
//! walk: a grant at any ancestor authorizes all descendants, and only
//! exhaustion of the walk produces a denial. Grant/revoke mutations are
//! authorized by a detached Ed25519 signature from the record owner and
//! persist through compare-and-swap so concurrent mutations on the same
//! path cannot lose updates.

mod record;

pub use record::{AccessRecord, KeyPattern};

use ed25519_dalek::Signature;

use crate::crypto::PublicKey;
use crate::outbox::OutboxDispatcher;
use crate::path::StorePath;
use crate::store::{Collection, Document, StoreError, StoreProvider, WriteCondition};

/// Mutations retry this many times on version conflict before giving up.
const MAX_CAS_RETRIES: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum AclError<E: std::fmt::Display + std::fmt::Debug> {
    /// The mutation signature does not verify against the record owner
    #[error("signature verification failed for {0}")]
    SignatureInvalid(String),
    /// No access record exists where one is required
    #[error("no access record for {0}")]
    NotFound(String),
    /// The grantee to revoke is not in the allowed set
    #[error("grantee {grantee} not present on {path}")]
    GranteeNotFound { path: String, grantee: String },
    /// A stored record failed to deserialize
    #[error("corrupt access record at {0}: {1}")]
    Corrupt(String, serde_json::Error),
    /// Retries exhausted against concurrent mutations on the same path
    #[error("too much contention mutating {0}")]
    Contention(String),
    #[error(transparent)]
    Store(#[from] StoreError<E>),
}

/// Result of a grant mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum GrantOutcome {
    /// The allowed set changed and was persisted
    Granted { path: String, allowed: Vec<KeyPattern> },
    /// The grantee was already present; nothing was written
    AlreadyGranted { path: String },
}

/// Result of a revoke mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RevokeOutcome {
    pub path: String,
    pub allowed: Vec<KeyPattern>,
}

/// The ACL component: permission resolution plus owner-signed
/// grant/revoke mutations against the access collection.
#[derive(Debug, Clone)]
pub struct Acl<P: StoreProvider> {
    provider: P,
    outbox: OutboxDispatcher,
}

impl<P: StoreProvider> Acl<P> {
    pub fn new(provider: P, outbox: OutboxDispatcher) -> Self {
        Self { provider, outbox }
    }

    /// Resolve effective write permission for `requester` on `path`.
    ///
    /// Paths outside the `users` namespace always allow. Within it,
    /// walk from the full path toward the namespace root, allowing as
    /// soon as any ancestor's record admits the requester. Absence or
    /// mismatch of a record at one level never blocks a shallower
    /// ancestor; only running out of ancestors denies.
    pub async fn resolve_write(
        &self,
        path: &StorePath,
        requester: &PublicKey,
    ) -> Result<bool, AclError<P::Error>> {
        if !path.in_user_namespace() {
            return Ok(true);
        }

        let mut current = Some(path.clone());
        while let Some(level) = current {
            let id = level.to_string();
            if let Some(doc) = self.provider.get_exact(Collection::Access, &id).await? {
                let record: AccessRecord =
                    doc.decode().map_err(|e| AclError::Corrupt(id.clone(), e))?;
                if record.admits(requester) {
                    tracing::debug!(path = %path, level = %id, "write allowed");
                    return Ok(true);
                }
            }
            current = level.parent();
        }

        tracing::debug!(path = %path, requester = %requester, "write denied");
        Ok(false)
    }

    /// Grant `grantee` write access on `path`.
    ///
    /// If no record exists one is created owned by `requester`'s
    /// asserted key before verification; the signature over
    /// `{path}-{grantee}-grant` must then verify against the record
    /// owner. A wildcard grant replaces the entire allowed set with
    /// `[*]`; a specific grant appends if absent and is otherwise an
    /// informational no-op.
    pub async fn grant(
        &self,
        path: &StorePath,
        grantee: &KeyPattern,
        signature: &Signature,
        requester: &PublicKey,
    ) -> Result<GrantOutcome, AclError<P::Error>> {
        let id = path.to_string();
        let message = format!("{}-{}-grant", id, grantee);

        for _ in 0..MAX_CAS_RETRIES {
            let existing = self.provider.get_exact(Collection::Access, &id).await?;
            let (mut record, condition) = match &existing {
                Some(doc) => {
                    let record: AccessRecord =
                        doc.decode().map_err(|e| AclError::Corrupt(id.clone(), e))?;
                    (record, WriteCondition::Version(doc.version))
                }
                None => (AccessRecord::new(*requester), WriteCondition::Absent),
            };

            record
                .owner
                .verify(message.as_bytes(), signature)
                .map_err(|_| AclError::SignatureInvalid(id.clone()))?;

            match grantee {
                KeyPattern::Wildcard => {
                    if record.allowed.len() == 1 && record.allowed[0].is_wildcard() {
                        return Ok(GrantOutcome::AlreadyGranted { path: id });
                    }
                    // The wildcard replaces all explicit entries
                    record.allowed = vec![KeyPattern::Wildcard];
                }
                specific => {
                    if record.allowed.contains(specific) {
                        return Ok(GrantOutcome::AlreadyGranted { path: id });
                    }
                    record.allowed.push(*specific);
                }
            }

            let doc = Document::new(id.clone(), &record)
                .map_err(|e| AclError::Corrupt(id.clone(), e))?;
            match self.provider.put(Collection::Access, doc, condition).await {
                Ok(stored_id) => {
                    self.outbox.dispatch(stored_id);
                    return Ok(GrantOutcome::Granted {
                        path: id,
                        allowed: record.allowed,
                    });
                }
                Err(StoreError::VersionConflict(_)) => {
                    tracing::debug!(path = %id, "grant lost a version race, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AclError::Contention(id))
    }

    /// Revoke `grantee`'s write access on `path`.
    ///
    /// Fails with `NotFound` when no record exists and with
    /// `GranteeNotFound` when the grantee is not in the allowed set.
    /// The signature over `{path}-{grantee}-revoke` must verify against
    /// the record owner.
    pub async fn revoke(
        &self,
        path: &StorePath,
        grantee: &KeyPattern,
        signature: &Signature,
    ) -> Result<RevokeOutcome, AclError<P::Error>> {
        let id = path.to_string();
        let message = format!("{}-{}-revoke", id, grantee);

        for _ in 0..MAX_CAS_RETRIES {
            let doc = self
                .provider
                .get_exact(Collection::Access, &id)
                .await?
                .ok_or_else(|| AclError::NotFound(id.clone()))?;
            let mut record: AccessRecord =
                doc.decode().map_err(|e| AclError::Corrupt(id.clone(), e))?;

            record
                .owner
                .verify(message.as_bytes(), signature)
                .map_err(|_| AclError::SignatureInvalid(id.clone()))?;

            let before = record.allowed.len();
            record.allowed.retain(|p| p != grantee);
            if record.allowed.len() == before {
                return Err(AclError::GranteeNotFound {
                    path: id,
                    grantee: grantee.to_string(),
                });
            }

            let updated = Document::new(id.clone(), &record)
                .map_err(|e| AclError::Corrupt(id.clone(), e))?;
            match self
                .provider
                .put(Collection::Access, updated, WriteCondition::Version(doc.version))
                .await
            {
                Ok(stored_id) => {
                    self.outbox.dispatch(stored_id);
                    return Ok(RevokeOutcome {
                        path: id,
                        allowed: record.allowed,
                    });
                }
                Err(StoreError::VersionConflict(_)) => {
                    tracing::debug!(path = %id, "revoke lost a version race, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AclError::Contention(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;
    use crate::outbox::Outbox;
    use crate::store::MemoryStoreProvider;

    fn acl() -> Acl<MemoryStoreProvider> {
        let (dispatcher, _outbox) = Outbox::new();
        Acl::new(MemoryStoreProvider::new(), dispatcher)
    }

    fn grant_sig(owner: &SecretKey, path: &str, grantee: &KeyPattern) -> Signature {
        owner.sign(format!("{}-{}-grant", path, grantee).as_bytes())
    }

    fn revoke_sig(owner: &SecretKey, path: &str, grantee: &KeyPattern) -> Signature {
        owner.sign(format!("{}-{}-revoke", path, grantee).as_bytes())
    }

    #[tokio::test]
    async fn test_first_grant_creates_record() {
        let acl = acl();
        let owner = SecretKey::generate();
        let friend = KeyPattern::from(SecretKey::generate().public());
        let path = StorePath::parse("users/alice/docs").unwrap();

        let sig = grant_sig(&owner, "users/alice/docs", &friend);
        let outcome = acl.grant(&path, &friend, &sig, &owner.public()).await.unwrap();
        assert!(matches!(outcome, GrantOutcome::Granted { .. }));

        assert!(acl
            .resolve_write(&path, &owner.public())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_grant_bad_signature() {
        let acl = acl();
        let owner = SecretKey::generate();
        let attacker = SecretKey::generate();
        let friend = KeyPattern::from(SecretKey::generate().public());
        let path = StorePath::parse("users/alice").unwrap();

        // Establish the record under `owner`
        let sig = grant_sig(&owner, "users/alice", &friend);
        acl.grant(&path, &friend, &sig, &owner.public()).await.unwrap();

        // A mutation signed by someone else must fail
        let other = KeyPattern::from(attacker.public());
        let bad_sig = grant_sig(&attacker, "users/alice", &other);
        let result = acl.grant(&path, &other, &bad_sig, &attacker.public()).await;
        assert!(matches!(result, Err(AclError::SignatureInvalid(_))));
    }

    #[tokio::test]
    async fn test_grant_idempotent() {
        let acl = acl();
        let owner = SecretKey::generate();
        let friend = KeyPattern::from(SecretKey::generate().public());
        let path = StorePath::parse("users/alice").unwrap();
        let sig = grant_sig(&owner, "users/alice", &friend);

        acl.grant(&path, &friend, &sig, &owner.public()).await.unwrap();
        let second = acl.grant(&path, &friend, &sig, &owner.public()).await.unwrap();
        assert!(matches!(second, GrantOutcome::AlreadyGranted { .. }));
    }

    #[tokio::test]
    async fn test_wildcard_replaces_explicit_entries() {
        let acl = acl();
        let owner = SecretKey::generate();
        let friend = KeyPattern::from(SecretKey::generate().public());
        let path = StorePath::parse("users/alice").unwrap();

        let sig = grant_sig(&owner, "users/alice", &friend);
        acl.grant(&path, &friend, &sig, &owner.public()).await.unwrap();

        let sig = grant_sig(&owner, "users/alice", &KeyPattern::Wildcard);
        let outcome = acl
            .grant(&path, &KeyPattern::Wildcard, &sig, &owner.public())
            .await
            .unwrap();
        match outcome {
            GrantOutcome::Granted { allowed, .. } => {
                assert_eq!(allowed, vec![KeyPattern::Wildcard]);
            }
            other => panic!("expected Granted, got {:?}", other),
        }

        // Any key may now write, including keys never granted
        let stranger = SecretKey::generate().public();
        assert!(acl.resolve_write(&path, &stranger).await.unwrap());
    }

    #[tokio::test]
    async fn test_specific_grant_keeps_wildcard() {
        let acl = acl();
        let owner = SecretKey::generate();
        let path = StorePath::parse("users/alice").unwrap();

        let sig = grant_sig(&owner, "users/alice", &KeyPattern::Wildcard);
        acl.grant(&path, &KeyPattern::Wildcard, &sig, &owner.public())
            .await
            .unwrap();

        // A later specific grant appends; only an explicit revoke
        // removes the wildcard
        let friend = KeyPattern::from(SecretKey::generate().public());
        let sig = grant_sig(&owner, "users/alice", &friend);
        acl.grant(&path, &friend, &sig, &owner.public()).await.unwrap();

        let stranger = SecretKey::generate().public();
        assert!(acl.resolve_write(&path, &stranger).await.unwrap());

        let sig = revoke_sig(&owner, "users/alice", &KeyPattern::Wildcard);
        acl.revoke(&path, &KeyPattern::Wildcard, &sig).await.unwrap();
        assert!(!acl.resolve_write(&path, &stranger).await.unwrap());
    }

    #[tokio::test]
    async fn test_ancestor_walk() {
        let acl = acl();
        let owner = SecretKey::generate();
        let friend = SecretKey::generate();
        let path = StorePath::parse("users/alice").unwrap();

        let pattern = KeyPattern::from(friend.public());
        let sig = grant_sig(&owner, "users/alice", &pattern);
        acl.grant(&path, &pattern, &sig, &owner.public()).await.unwrap();

        // Grant at the ancestor authorizes all descendants
        let deep = StorePath::parse("users/alice/docs/2024/note").unwrap();
        assert!(acl.resolve_write(&deep, &friend.public()).await.unwrap());

        // But not siblings
        let sibling = StorePath::parse("users/bob/docs").unwrap();
        assert!(!acl.resolve_write(&sibling, &friend.public()).await.unwrap());
    }

    #[tokio::test]
    async fn test_outside_namespace_always_allows() {
        let acl = acl();
        let anyone = SecretKey::generate().public();
        let path = StorePath::parse("public/configs/app").unwrap();
        assert!(acl.resolve_write(&path, &anyone).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke() {
        let acl = acl();
        let owner = SecretKey::generate();
        let friend = SecretKey::generate();
        let pattern = KeyPattern::from(friend.public());
        let path = StorePath::parse("users/alice").unwrap();

        let sig = grant_sig(&owner, "users/alice", &pattern);
        acl.grant(&path, &pattern, &sig, &owner.public()).await.unwrap();
        assert!(acl.resolve_write(&path, &friend.public()).await.unwrap());

        let sig = revoke_sig(&owner, "users/alice", &pattern);
        let outcome = acl.revoke(&path, &pattern, &sig).await.unwrap();
        assert!(outcome.allowed.is_empty());
        assert!(!acl.resolve_write(&path, &friend.public()).await.unwrap());

        // Revoking again reports the grantee missing
        let result = acl.revoke(&path, &pattern, &sig).await;
        assert!(matches!(result, Err(AclError::GranteeNotFound { .. })));
    }

    #[tokio::test]
    async fn test_revoke_no_record() {
        let acl = acl();
        let owner = SecretKey::generate();
        let pattern = KeyPattern::from(SecretKey::generate().public());
        let path = StorePath::parse("users/ghost").unwrap();

        let sig = revoke_sig(&owner, "users/ghost", &pattern);
        let result = acl.revoke(&path, &pattern, &sig).await;
        assert!(matches!(result, Err(AclError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_grants_both_land() {
        let acl = acl();
        let owner = SecretKey::generate();
        let path = StorePath::parse("users/alice").unwrap();

        let a = KeyPattern::from(SecretKey::generate().public());
        let b = KeyPattern::from(SecretKey::generate().public());
        let sig_a = grant_sig(&owner, "users/alice", &a);
        let sig_b = grant_sig(&owner, "users/alice", &b);

        let owner_pub = owner.public();
        let (ra, rb) = tokio::join!(
            acl.grant(&path, &a, &sig_a, &owner_pub),
            acl.grant(&path, &b, &sig_b, &owner_pub),
        );
        ra.unwrap();
        rb.unwrap();

        // CAS retry means neither grant is lost
        let key_a = match a {
            KeyPattern::Key(k) => k,
            _ => unreachable!(),
        };
        let key_b = match b {
            KeyPattern::Key(k) => k,
            _ => unreachable!(),
        };
        assert!(acl.resolve_write(&path, &key_a).await.unwrap());
        assert!(acl.resolve_write(&path, &key_b).await.unwrap());
    }
}
