//! AgentCred Configuration
//!
//! Endpoint URLs and the OAuth client id, passed explicitly to every
//! operation. Storage is never selected here; key stores are constructed by
//! the caller and handed in as values.

/// Default registry base URL.
pub const DEFAULT_API_URL: &str = "https://api.agentcred.dev";

/// Default identity-provider API base URL.
pub const DEFAULT_PROVIDER_API_URL: &str = "https://api.github.com";

/// Default OAuth host for the device-authorization endpoints.
pub const DEFAULT_OAUTH_URL: &str = "https://github.com";

/// OAuth app client id used when the caller does not supply one.
pub const DEFAULT_CLIENT_ID: &str = "Ov23lilcYBamYnpi7qNb";

/// Endpoints and credentials for registry, provider, and OAuth calls.
#[derive(Clone, Debug)]
pub struct AgentCredConfig {
    /// Registry base URL (`POST /v1/keys`, `GET /v1/keys/:name`).
    pub api_url: String,
    /// Identity-provider API base URL (`GET /user`).
    pub provider_api_url: String,
    /// OAuth host for device-code and token-poll endpoints.
    pub oauth_url: String,
    /// OAuth app client id for the device flow.
    pub client_id: String,
}

impl Default for AgentCredConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            provider_api_url: DEFAULT_PROVIDER_API_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

impl AgentCredConfig {
    /// Defaults with `AGENTCRED_API_URL` / `AGENTCRED_CLIENT_ID` overrides
    /// applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("AGENTCRED_API_URL") {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        if let Ok(id) = std::env::var("AGENTCRED_CLIENT_ID") {
            if !id.is_empty() {
                config.client_id = id;
            }
        }
        config
    }
}
