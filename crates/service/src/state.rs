use common::prelude::*;

use super::config::Config;

/// Main service state - the domain components wired over one provider.
///
/// Cheap to clone; every component shares the same underlying store
/// handle and outbox dispatcher.
#[derive(Clone)]
pub struct State {
    provider: MemoryStoreProvider,
    accounts: Accounts<MemoryStoreProvider>,
    acl: Acl<MemoryStoreProvider>,
    gateway: ContentGateway<MemoryStoreProvider>,
    signer: TokenSigner,
}

impl State {
    /// Build state from config. Returns the outbox receiving end
    /// alongside; the caller owns running its worker.
    pub fn from_config(config: &Config) -> Result<(Self, Outbox), StateSetupError> {
        let signer = match &config.token_secret_hex {
            Some(hex_secret) => {
                let secret =
                    hex::decode(hex_secret).map_err(|_| StateSetupError::InvalidTokenSecret)?;
                TokenSigner::new(secret)
            }
            None => {
                tracing::warn!("no token secret configured, generating an ephemeral one");
                TokenSigner::generate()
            }
        };

        let provider = MemoryStoreProvider::new();
        let (dispatcher, outbox) = Outbox::new();

        Ok((
            Self {
                accounts: Accounts::new(provider.clone(), dispatcher.clone()),
                acl: Acl::new(provider.clone(), dispatcher.clone()),
                gateway: ContentGateway::new(provider.clone(), dispatcher),
                signer,
                provider,
            },
            outbox,
        ))
    }

    pub fn provider(&self) -> &MemoryStoreProvider {
        &self.provider
    }

    pub fn accounts(&self) -> &Accounts<MemoryStoreProvider> {
        &self.accounts
    }

    pub fn acl(&self) -> &Acl<MemoryStoreProvider> {
        &self.acl
    }

    pub fn gateway(&self) -> &ContentGateway<MemoryStoreProvider> {
        &self.gateway
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Probe the store through the ordinary read path. Used by the
    /// health route and the keep-alive poller.
    pub async fn is_ready(&self) -> bool {
        self.provider.get(Collection::Data, "").await.is_ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("token secret is not valid hex")]
    InvalidTokenSecret,
}
