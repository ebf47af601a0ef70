//! Registry HTTP Client
//!
//! `POST /v1/keys` registers a public key for the authenticated account;
//! `GET /v1/keys/:account` returns the account's current key or 404.

use reqwest::Client;

use crate::config::AgentCredConfig;
use crate::crypto::PublicJwk;
use crate::error::{Error, Result};
use crate::storage::validate_account_name;
use crate::types::RegisteredKey;

/// Client for the public-key registry.
pub struct RegistryClient {
    pub api_url: String,
    http: Client,
}

impl RegistryClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &AgentCredConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    /// Register a public key for the account the bearer token belongs to.
    ///
    /// The registry decides the account name from the token; the response's
    /// `registered_at` is authoritative.
    pub async fn register_key(
        &self,
        token: &str,
        public_key: &PublicJwk,
    ) -> Result<RegisteredKey> {
        let resp = self
            .http
            .post(format!("{}/v1/keys", self.api_url))
            .bearer_auth(token)
            .header("User-Agent", "agentcred")
            .json(&serde_json::json!({ "public_key": public_key }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Registration(format!("{}: {}", status.as_u16(), body)));
        }

        Ok(resp.json().await?)
    }

    /// Look up the current key for an account. `Ok(None)` when the registry
    /// has no key for it (or refuses the lookup).
    pub async fn fetch_key(&self, account: &str) -> Result<Option<RegisteredKey>> {
        validate_account_name(account)?;

        let resp = self
            .http
            .get(format!("{}/v1/keys/{}", self.api_url, account))
            .header("User-Agent", "agentcred")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        Ok(Some(resp.json().await?))
    }
}

/// Resolve an account's current public key, flattening every failure
/// (unknown account, malformed name, network fault) into `None`.
pub async fn resolve_public_key(
    account: &str,
    config: &AgentCredConfig,
) -> Option<PublicJwk> {
    let registry = RegistryClient::from_config(config);
    match registry.fetch_key(account).await {
        Ok(record) => record.map(|r| r.public_key),
        Err(e) => {
            tracing::debug!(account, error = %e, "public key lookup failed");
            None
        }
    }
}
