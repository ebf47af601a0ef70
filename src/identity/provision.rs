//! Identity Creation and Loading
//!
//! `create_identity` authenticates a provider token, generates a fresh
//! Ed25519 keypair, registers the public half, and persists the private half
//! keyed by the provider-reported login. `load_identity` re-derives an
//! identity from local key material plus a registry lookup; the registry, not
//! local storage, is the trust anchor for the public key.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AgentCredConfig;
use crate::crypto::{self, PrivateJwk, PublicJwk};
use crate::error::{Error, Result};
use crate::registry::{resolve_public_key, RegistryClient};
use crate::storage::KeyStore;
use crate::types::{GithubAccount, Identity, LoadedIdentity};

#[derive(Deserialize)]
struct ProviderProfile {
    login: String,
    id: u64,
    avatar_url: String,
}

/// Fetch the authenticated account's profile from the identity provider.
async fn fetch_profile(token: &str, config: &AgentCredConfig) -> Result<ProviderProfile> {
    let resp = Client::new()
        .get(format!("{}/user", config.provider_api_url))
        .bearer_auth(token)
        .header("User-Agent", "agentcred")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication(format!("{}: {}", status.as_u16(), body)));
    }

    Ok(resp.json().await?)
}

/// Create a new identity:
///
/// 1. Authenticate the token against the provider's account endpoint
/// 2. Generate a fresh Ed25519 keypair (always fresh, no reuse)
/// 3. Register the public key with the registry under the same token
/// 4. Persist the private key keyed by the provider-reported login
///
/// The account name comes from the provider, never from the caller, so a
/// stored key can only ever belong to the account the token authenticated.
pub async fn create_identity(
    token: &str,
    config: &AgentCredConfig,
    storage: &dyn KeyStore,
) -> Result<Identity> {
    let profile = fetch_profile(token, config).await?;

    let signing_key = crypto::generate_signing_key();
    let public_jwk = PublicJwk::from_verifying_key(&signing_key.verifying_key());
    let private_jwk = PrivateJwk::from_signing_key(&signing_key);
    let fingerprint = crypto::fingerprint(&public_jwk)?;

    let registry = RegistryClient::from_config(config);
    let registration = registry.register_key(token, &public_jwk).await?;

    storage.save(&profile.login, &private_jwk)?;

    tracing::info!(account = %profile.login, %fingerprint, "identity created");

    Ok(Identity {
        github: GithubAccount {
            username: profile.login,
            id: profile.id,
            avatar_url: profile.avatar_url,
        },
        public_key: public_jwk,
        fingerprint,
        registered_at: registration.registered_at,
    })
}

/// Load an identity for signing.
///
/// Returns `Ok(None)` when no private key is stored for the account, and
/// also when the registry has no current public key for it; a local key
/// without a registry entry is not a usable identity.
///
/// Limitation: the numeric account id, avatar URL, and original registration
/// timestamp are not retained locally, so the returned identity carries id
/// `0`, an empty avatar URL, and the load time as `registered_at`.
pub async fn load_identity(
    account: &str,
    config: &AgentCredConfig,
    storage: &dyn KeyStore,
) -> Result<Option<LoadedIdentity>> {
    let Some(private_jwk) = storage.load(account)? else {
        return Ok(None);
    };

    let Some(public_jwk) = resolve_public_key(account, config).await else {
        tracing::debug!(account, "no registry entry for stored key");
        return Ok(None);
    };

    let signing_key = private_jwk.to_signing_key()?;
    let fingerprint = crypto::fingerprint(&public_jwk)?;

    Ok(Some(LoadedIdentity {
        identity: Identity {
            github: GithubAccount {
                username: account.to_string(),
                id: 0,
                avatar_url: String::new(),
            },
            public_key: public_jwk,
            fingerprint,
            registered_at: Utc::now().to_rfc3339(),
        },
        signing_key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyStore;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> AgentCredConfig {
        AgentCredConfig {
            api_url: server.uri(),
            provider_api_url: server.uri(),
            ..AgentCredConfig::default()
        }
    }

    async fn mount_provider_user(server: &MockServer, login: &str) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(bearer_token("gho_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "login": login,
                "id": 42,
                "avatar_url": "https://avatars.example/42",
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_create_identity() {
        let server = MockServer::start().await;
        mount_provider_user(&server, "alice").await;
        // Only `registered_at` is read from the response; the echoed key can
        // be any well-formed record.
        let echoed = PublicJwk::from_verifying_key(&crypto::generate_signing_key().verifying_key());
        Mock::given(method("POST"))
            .and(path("/v1/keys"))
            .and(bearer_token("gho_token"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "github": "alice",
                "public_key": echoed,
                "registered_at": "2026-01-02T03:04:05Z",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryKeyStore::new();
        let config = test_config(&server);
        let identity = create_identity("gho_token", &config, &storage)
            .await
            .unwrap();

        assert_eq!(identity.github.username, "alice");
        assert_eq!(identity.github.id, 42);
        assert_eq!(identity.registered_at, "2026-01-02T03:04:05Z");
        assert_eq!(
            identity.fingerprint,
            crypto::fingerprint(&identity.public_key).unwrap()
        );

        // Private key stored under the provider-reported login.
        let stored = storage.load("alice").unwrap().unwrap();
        assert_eq!(stored.public_jwk(), identity.public_key);
    }

    #[tokio::test]
    async fn test_create_identity_bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let storage = MemoryKeyStore::new();
        let err = create_identity("gho_token", &test_config(&server), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert!(storage.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_identity_registry_rejection() {
        let server = MockServer::start().await;
        mount_provider_user(&server, "alice").await;
        Mock::given(method("POST"))
            .and(path("/v1/keys"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let storage = MemoryKeyStore::new();
        let err = create_identity("gho_token", &test_config(&server), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Registration(_)));
        // Nothing persisted when registration fails.
        assert!(storage.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_identity_round_trip() {
        let server = MockServer::start().await;
        let signing_key = crypto::generate_signing_key();
        let private_jwk = PrivateJwk::from_signing_key(&signing_key);
        let public_jwk = private_jwk.public_jwk();

        Mock::given(method("GET"))
            .and(path("/v1/keys/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "github": "alice",
                "public_key": public_jwk,
                "registered_at": "2026-01-02T03:04:05Z",
            })))
            .mount(&server)
            .await;

        let storage = MemoryKeyStore::new();
        storage.save("alice", &private_jwk).unwrap();

        let loaded = load_identity("alice", &test_config(&server), &storage)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.identity.github.username, "alice");
        assert_eq!(loaded.identity.github.id, 0);
        assert_eq!(loaded.identity.public_key, public_jwk);
        assert_eq!(
            loaded.identity.fingerprint,
            crypto::fingerprint(&public_jwk).unwrap()
        );
        assert_eq!(loaded.signing_key.as_bytes(), signing_key.as_bytes());
    }

    #[tokio::test]
    async fn test_load_identity_missing_local_key() {
        let server = MockServer::start().await;
        let storage = MemoryKeyStore::new();
        let loaded = load_identity("alice", &test_config(&server), &storage)
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_identity_requires_registry_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/alice"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let storage = MemoryKeyStore::new();
        storage
            .save("alice", &PrivateJwk::from_signing_key(&crypto::generate_signing_key()))
            .unwrap();

        // Local key without a registry entry is not a usable identity.
        let loaded = load_identity("alice", &test_config(&server), &storage)
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
