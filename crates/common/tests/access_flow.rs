//! End-to-end flow across accounts, ACL, and the content gateway:
//! register, grant, and write with inherited permission.

mod common;

use ::common::prelude::*;

#[tokio::test]
async fn test_register_grant_write_flow() {
    let env = common::setup_test_env();

    // Register alice
    let alice = SecretKey::generate();
    env.accounts
        .register("alice", alice.public(), &hash_password("hunter2"))
        .await
        .unwrap();

    // Registration created the self-owned record: alice may write
    // anywhere under her own prefix
    let own_path = StorePath::parse(&format!("users/{}/profile", alice.public())).unwrap();
    assert!(env.acl.resolve_write(&own_path, &alice.public()).await.unwrap());

    // A second subject may not, until granted
    let bob = SecretKey::generate();
    assert!(!env.acl.resolve_write(&own_path, &bob.public()).await.unwrap());

    // Alice grants bob on her root record
    let root = StorePath::parse(&format!("users/{}", alice.public())).unwrap();
    let grantee = KeyPattern::from(bob.public());
    let sig = common::sign_grant(&alice, &root.to_string(), &grantee);
    env.acl
        .grant(&root, &grantee, &sig, &alice.public())
        .await
        .unwrap();

    // The ancestor grant covers the descendant path
    assert!(env.acl.resolve_write(&own_path, &bob.public()).await.unwrap());

    // A third subject is still denied
    let carol = SecretKey::generate();
    assert!(!env.acl.resolve_write(&own_path, &carol.public()).await.unwrap());

    // And bob's authorized write lands
    env.gateway
        .write(&own_path, serde_json::json!({ "name": "set by bob" }))
        .await
        .unwrap();
    let records = env.gateway.fetch(&own_path).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_reregister_keeps_existing_grants() {
    let env = common::setup_test_env();

    let alice = SecretKey::generate();
    env.accounts
        .register("alice", alice.public(), &hash_password("pw"))
        .await
        .unwrap();

    // Alice grants bob on her root record
    let bob = SecretKey::generate();
    let root = StorePath::parse(&format!("users/{}", alice.public())).unwrap();
    let grantee = KeyPattern::from(bob.public());
    let sig = common::sign_grant(&alice, &root.to_string(), &grantee);
    env.acl
        .grant(&root, &grantee, &sig, &alice.public())
        .await
        .unwrap();
    assert!(env.acl.resolve_write(&root, &bob.public()).await.unwrap());

    // A retried registration with the identical credential must not
    // touch the existing record; only an owner-signed revoke removes
    // a grant
    env.accounts
        .register("alice", alice.public(), &hash_password("pw"))
        .await
        .unwrap();
    assert!(env.acl.resolve_write(&root, &bob.public()).await.unwrap());
}

#[tokio::test]
async fn test_immutable_write_under_granted_prefix() {
    let env = common::setup_test_env();

    let alice = SecretKey::generate();
    env.accounts
        .register("alice", alice.public(), &hash_password("pw"))
        .await
        .unwrap();

    // Content-addressed write under alice's own prefix
    let digest = PayloadDigest::compute(b"hello");
    let path = StorePath::parse(&format!(
        "users/{}/files/{}",
        alice.public(),
        digest.to_segment()
    ))
    .unwrap();
    assert!(env.acl.resolve_write(&path, &alice.public()).await.unwrap());

    let outcome = env
        .gateway
        .write(&path, serde_json::json!("hello"))
        .await
        .unwrap();
    assert!(outcome.immutable);

    // Write-once: the identical write now conflicts
    let repeat = env.gateway.write(&path, serde_json::json!("hello")).await;
    assert!(matches!(repeat, Err(GatewayError::AlreadyExists(_))));

    // And the stored record is immune to prefix deletion through the
    // digest-marker guard
    let marker_prefix = StorePath::parse(&format!(
        "users/{}/files/{}",
        alice.public(),
        digest.to_segment()
    ))
    .unwrap();
    assert!(matches!(
        env.gateway.delete_mutable(&marker_prefix).await,
        Err(GatewayError::ImmutablePath(_))
    ));
}

#[tokio::test]
async fn test_session_tokens_for_registered_subject() {
    let env = common::setup_test_env();

    let alice = SecretKey::generate();
    env.accounts
        .register("alice", alice.public(), &hash_password("pw"))
        .await
        .unwrap();
    let credential = env.accounts.authenticate("alice", "pw").await.unwrap();

    let pair = env.signer.mint_pair(&credential.alias, Some(credential.public_key));
    let claims = env
        .signer
        .verify(&pair.access_token, TokenKind::Access)
        .unwrap();
    assert_eq!(claims.alias, "alice");
    assert_eq!(claims.public_key, Some(alice.public()));

    // Refresh exchanges for a fresh pair with identical subject claims
    let refreshed = env.signer.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
    let new_pair = env
        .signer
        .mint_pair(&refreshed.alias, refreshed.public_key);
    let new_claims = env
        .signer
        .verify(&new_pair.access_token, TokenKind::Access)
        .unwrap();
    assert_eq!(new_claims.alias, claims.alias);
    assert_eq!(new_claims.public_key, claims.public_key);
}
