// src/provision.rs
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ProvisionError, Result};
use crate::types::ProvisionedConfig;
use crate::{identity, keys, register, synth};

/// Runs provisioning attempts against a relay.
///
/// Holds only the HTTP client and endpoint URLs; every attempt builds its own
/// key pair, identity and account, so concurrent attempts share nothing.
#[derive(Debug, Clone)]
pub struct Provisioner {
    client: reqwest::Client,
    keys_url: String,
    registration_url: String,
    attempt_timeout: Duration,
}

impl Provisioner {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ProvisionError::transport)?;
        Ok(Self {
            client,
            keys_url: config.keys_url(),
            registration_url: config.registration_url(),
            attempt_timeout: config.attempt_timeout,
        })
    }

    pub async fn provision(&self) -> Result<ProvisionedConfig> {
        self.provision_with_cancel(&CancellationToken::new()).await
    }

    /// One bounded attempt. Cancelling `cancel` or exceeding the attempt timeout
    /// aborts it without producing artifacts.
    pub async fn provision_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ProvisionedConfig> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("provisioning cancelled");
                Err(ProvisionError::Cancelled)
            }
            res = tokio::time::timeout(self.attempt_timeout, self.attempt()) => {
                res.unwrap_or_else(|_| {
                    warn!("provisioning timed out after {:?}", self.attempt_timeout);
                    Err(ProvisionError::TimedOut)
                })
            }
        }
    }

    async fn attempt(&self) -> Result<ProvisionedConfig> {
        let ident = identity::generate_identity();
        let pair = keys::acquire_key_pair(&self.client, &self.keys_url).await?;

        let account = register::register(
            &self.client,
            &self.registration_url,
            &pair.public_key,
            &ident.install_id,
            &ident.fcm_token,
        )
        .await?;

        let out = synth::synthesize(&account, &pair.private_key)?;
        info!(account_id = ?account.id, "provisioned configuration");
        Ok(out)
    }
}
