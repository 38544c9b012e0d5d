//! Shared test utilities for gateway integration tests
#![allow(dead_code)]

use common::prelude::*;

/// Everything a flow test needs, wired over one in-memory provider.
pub struct TestEnv {
    pub provider: MemoryStoreProvider,
    pub accounts: Accounts<MemoryStoreProvider>,
    pub acl: Acl<MemoryStoreProvider>,
    pub gateway: ContentGateway<MemoryStoreProvider>,
    pub signer: TokenSigner,
}

pub fn setup_test_env() -> TestEnv {
    let provider = MemoryStoreProvider::new();
    let (dispatcher, _outbox) = Outbox::new();
    TestEnv {
        accounts: Accounts::new(provider.clone(), dispatcher.clone()),
        acl: Acl::new(provider.clone(), dispatcher.clone()),
        gateway: ContentGateway::new(provider.clone(), dispatcher),
        signer: TokenSigner::generate(),
        provider,
    }
}

/// Sign the grant message for a path/grantee pair.
pub fn sign_grant(owner: &SecretKey, path: &str, grantee: &KeyPattern) -> ed25519_dalek::Signature {
    owner.sign(format!("{}-{}-grant", path, grantee).as_bytes())
}
