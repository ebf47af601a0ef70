//! Envelope Verification
//!
//! One validation pipeline behind two entry points: `verify_offline` takes
//! the public key directly, `verify` resolves it through the registry. Both
//! are total: every failure, including an unexpected internal fault, becomes
//! a `Verification::Failed` value.

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;

use crate::config::AgentCredConfig;
use crate::crypto;
use crate::envelope::sign::ISSUER_SUFFIX;
use crate::jws::{self, JWS_ALG};
use crate::registry::resolve_public_key;
use crate::types::{Envelope, GithubAccount, Verification, VerifyFailure};

/// Envelopes older (or claiming to be newer) than this many seconds are
/// rejected regardless of signature validity. A freshness bound, not a
/// substitute for revocation.
pub const MAX_AGE_SECS: i64 = 86_400;

/// Verify an envelope against a supplied public key. Pure, no network.
pub fn verify_offline(envelope: &Envelope, public_key: &VerifyingKey) -> Verification {
    // The pipeline itself only produces Failed values; the catch here is for
    // faults it did not anticipate, so a verifier call always completes.
    match run_pipeline(envelope, public_key) {
        Ok(verification) => verification,
        Err(e) => Verification::failed(VerifyFailure::Internal(e.to_string())),
    }
}

fn run_pipeline(
    envelope: &Envelope,
    public_key: &VerifyingKey,
) -> crate::error::Result<Verification> {
    let decoded = match jws::decode_compact(&envelope.agentcred.jws) {
        Ok(decoded) => decoded,
        Err(e) => {
            return Ok(Verification::failed(VerifyFailure::Malformed(
                e.to_string(),
            )))
        }
    };

    if decoded.header.alg != JWS_ALG {
        return Ok(Verification::failed(VerifyFailure::UnsupportedAlgorithm(
            decoded.header.alg.clone(),
        )));
    }

    if !decoded.verify_signature(public_key) {
        return Ok(Verification::failed(VerifyFailure::InvalidSignature));
    }

    let claims = &decoded.claims;

    let actual_hash = crypto::sha256_hex(envelope.content.as_bytes());
    let expected_hash = claims
        .content_hash
        .strip_prefix("sha256:")
        .unwrap_or(&claims.content_hash);
    if !crypto::constant_time_eq(actual_hash.as_bytes(), expected_hash.as_bytes()) {
        return Ok(Verification::failed(VerifyFailure::HashMismatch));
    }

    let expected_issuer = format!("{}{}", envelope.agentcred.github, ISSUER_SUFFIX);
    if claims.iss != expected_issuer {
        return Ok(Verification::failed(VerifyFailure::IssuerMismatch));
    }

    let now = Utc::now().timestamp();
    if (now - claims.iat).abs() > MAX_AGE_SECS {
        return Ok(Verification::failed(VerifyFailure::Expired));
    }

    let Some(signed_at) = DateTime::<Utc>::from_timestamp(claims.iat, 0) else {
        return Ok(Verification::failed(VerifyFailure::Malformed(format!(
            "unrepresentable iat {}",
            claims.iat
        ))));
    };

    Ok(Verification::Verified {
        github: GithubAccount {
            username: envelope.agentcred.github.clone(),
            id: 0,
            avatar_url: String::new(),
        },
        agent: claims.sub.clone(),
        signed_at,
    })
}

/// Verify an envelope against the registry's current key for its account.
pub async fn verify(envelope: &Envelope, config: &AgentCredConfig) -> Verification {
    let Some(public_jwk) = resolve_public_key(&envelope.agentcred.github, config).await else {
        return Verification::failed(VerifyFailure::UnknownAccount);
    };

    let public_key = match public_jwk.to_verifying_key() {
        Ok(key) => key,
        Err(e) => return Verification::failed(VerifyFailure::Internal(e.to_string())),
    };

    verify_offline(envelope, &public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_signing_key, PublicJwk};
    use crate::envelope::sign::sign;
    use crate::jws::{sign_compact, ClaimSet, ProtectedHeader};
    use crate::types::{SignIdentity, SignOptions};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alice() -> SignIdentity {
        SignIdentity {
            signing_key: generate_signing_key(),
            github: "alice".to_string(),
        }
    }

    fn public_key(identity: &SignIdentity) -> VerifyingKey {
        identity.signing_key.verifying_key()
    }

    /// Build a properly signed envelope with an arbitrary claim set.
    fn envelope_with_claims(identity: &SignIdentity, claims: ClaimSet, content: &str) -> Envelope {
        let header = ProtectedHeader {
            alg: JWS_ALG.to_string(),
            typ: "agentcred+jwt".to_string(),
            kid: claims.iss.clone(),
        };
        let token = sign_compact(&header, &claims, &identity.signing_key).unwrap();
        Envelope {
            agentcred: crate::types::EnvelopeMeta {
                v: "1.0".to_string(),
                jws: token,
                github: identity.github.clone(),
                agent: claims.sub.clone(),
            },
            content: content.to_string(),
        }
    }

    fn claims_now(identity: &SignIdentity, content: &str) -> ClaimSet {
        ClaimSet {
            iss: format!("{}@agentcred", identity.github),
            sub: "default".to_string(),
            iat: Utc::now().timestamp(),
            content_hash: format!("sha256:{}", crypto::sha256_hex(content.as_bytes())),
            content_type: "text/plain".to_string(),
            nonce: "test-nonce".to_string(),
        }
    }

    #[test]
    fn test_round_trip_verifies() {
        let identity = alice();
        let envelope = sign("Important message", &identity, None).unwrap();

        match verify_offline(&envelope, &public_key(&identity)) {
            Verification::Verified {
                github,
                agent,
                signed_at,
            } => {
                assert_eq!(github.username, "alice");
                assert_eq!(agent, "default");
                assert!(signed_at <= Utc::now());
            }
            Verification::Failed { reason } => panic!("expected success, got {reason}"),
        }
    }

    #[test]
    fn test_tampered_content_is_hash_mismatch() {
        let identity = alice();
        let mut envelope = sign("original", &identity, None).unwrap();
        envelope.content = "tampered".to_string();

        assert_eq!(
            verify_offline(&envelope, &public_key(&identity)),
            Verification::failed(VerifyFailure::HashMismatch)
        );
    }

    #[test]
    fn test_tampered_account_is_issuer_mismatch() {
        let identity = alice();
        let mut envelope = sign("content", &identity, None).unwrap();
        envelope.agentcred.github = "mallory".to_string();

        assert_eq!(
            verify_offline(&envelope, &public_key(&identity)),
            Verification::failed(VerifyFailure::IssuerMismatch)
        );
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let identity = alice();
        let envelope = sign("content", &identity, None).unwrap();
        let other = generate_signing_key();

        assert_eq!(
            verify_offline(&envelope, &other.verifying_key()),
            Verification::failed(VerifyFailure::InvalidSignature)
        );
    }

    #[test]
    fn test_non_eddsa_algorithm_is_rejected() {
        let identity = alice();
        let content = "content";
        let claims = claims_now(&identity, content);
        let header = ProtectedHeader {
            alg: "HS256".to_string(),
            typ: "agentcred+jwt".to_string(),
            kid: claims.iss.clone(),
        };
        let token = sign_compact(&header, &claims, &identity.signing_key).unwrap();
        let mut envelope = sign(content, &identity, None).unwrap();
        envelope.agentcred.jws = token;

        assert_eq!(
            verify_offline(&envelope, &public_key(&identity)),
            Verification::failed(VerifyFailure::UnsupportedAlgorithm("HS256".to_string()))
        );
    }

    #[test]
    fn test_expired_envelope_rejected_both_directions() {
        let identity = alice();
        let content = "content";

        for skew in [-(MAX_AGE_SECS + 1), MAX_AGE_SECS + 1] {
            let mut claims = claims_now(&identity, content);
            claims.iat = Utc::now().timestamp() + skew;
            let envelope = envelope_with_claims(&identity, claims, content);
            assert_eq!(
                verify_offline(&envelope, &public_key(&identity)),
                Verification::failed(VerifyFailure::Expired),
                "skew {skew} should be outside the window"
            );
        }

        // Just inside the window still verifies.
        let mut claims = claims_now(&identity, content);
        claims.iat = Utc::now().timestamp() - (MAX_AGE_SECS - 60);
        let envelope = envelope_with_claims(&identity, claims, content);
        assert!(verify_offline(&envelope, &public_key(&identity)).is_verified());
    }

    #[test]
    fn test_garbage_token_is_malformed_not_a_panic() {
        let identity = alice();
        let mut envelope = sign("content", &identity, None).unwrap();
        envelope.agentcred.jws = "not.a.token".to_string();

        match verify_offline(&envelope, &public_key(&identity)) {
            Verification::Failed {
                reason: VerifyFailure::Malformed(_),
            } => {}
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_agent_name_round_trips() {
        let identity = alice();
        let options = SignOptions {
            agent: Some("summarizer".to_string()),
            content_type: None,
        };
        let envelope = sign("content", &identity, Some(options)).unwrap();

        match verify_offline(&envelope, &public_key(&identity)) {
            Verification::Verified { agent, .. } => assert_eq!(agent, "summarizer"),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_resolves_key_from_registry() {
        let server = MockServer::start().await;
        let identity = alice();
        let public_jwk = PublicJwk::from_verifying_key(&identity.signing_key.verifying_key());

        Mock::given(method("GET"))
            .and(path("/v1/keys/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "github": "alice",
                "public_key": public_jwk,
                "registered_at": "2026-01-02T03:04:05Z",
            })))
            .mount(&server)
            .await;

        let config = AgentCredConfig {
            api_url: server.uri(),
            ..AgentCredConfig::default()
        };
        let envelope = sign("content", &identity, None).unwrap();
        assert!(verify(&envelope, &config).await.is_verified());
    }

    #[tokio::test]
    async fn test_verify_unknown_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/alice"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = AgentCredConfig {
            api_url: server.uri(),
            ..AgentCredConfig::default()
        };
        let envelope = sign("content", &alice(), None).unwrap();
        assert_eq!(
            verify(&envelope, &config).await,
            Verification::failed(VerifyFailure::UnknownAccount)
        );
    }

    #[tokio::test]
    async fn test_replay_of_unexpired_envelope_reverifies() {
        // The nonce is never tracked, so verifying the same envelope twice
        // succeeds twice. Documented protocol behavior.
        let identity = alice();
        let envelope = sign("content", &identity, None).unwrap();
        assert!(verify_offline(&envelope, &public_key(&identity)).is_verified());
        assert!(verify_offline(&envelope, &public_key(&identity)).is_verified());
    }
}
