//! AgentCred Shared Types
//!
//! Wire-facing structs keep the exact field names of the envelope and
//! registry JSON; API-facing structs follow the camelCase convention of the
//! hosted service.

use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::crypto::PublicJwk;

// ─── Identity ────────────────────────────────────────────────────

/// The GitHub account an identity is attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubAccount {
    pub username: String,
    pub id: u64,
    pub avatar_url: String,
}

/// A registered identity: account metadata plus the public half of the
/// keypair and its fingerprint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub github: GithubAccount,
    pub public_key: PublicJwk,
    /// Hex SHA-256 of the canonical public JWK. Recomputed, never cached.
    pub fingerprint: String,
    /// RFC-3339 timestamp; the registry is authoritative for this field.
    pub registered_at: String,
}

/// An identity loaded together with its private key, ready to sign.
pub struct LoadedIdentity {
    pub identity: Identity,
    pub signing_key: SigningKey,
}

/// The minimum needed to sign: a private key and the account it belongs to.
pub struct SignIdentity {
    pub signing_key: SigningKey,
    pub github: String,
}

// ─── Envelope ────────────────────────────────────────────────────

/// Signed-content container exchanged between signer and verifier.
///
/// `content` is carried verbatim; only its hash is inside the signed token,
/// so integrity holds only once a verifier recomputes the hash over it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub agentcred: EnvelopeMeta,
    pub content: String,
}

/// The `agentcred` block of an envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Protocol version, `"1.0"`.
    pub v: String,
    /// Compact EdDSA token over the claim set.
    pub jws: String,
    /// Account name the envelope claims attribution to.
    pub github: String,
    /// Agent name the content was produced by.
    pub agent: String,
}

/// Optional knobs for `sign`.
#[derive(Clone, Debug, Default)]
pub struct SignOptions {
    /// Agent name, defaults to `"default"`.
    pub agent: Option<String>,
    /// Claimed content type, defaults to `"text/plain"`.
    pub content_type: Option<String>,
}

// ─── Verification ────────────────────────────────────────────────

/// Outcome of envelope verification.
///
/// Verification is total: every failure becomes a `Failed` value, never an
/// `Err` or a panic.
#[derive(Clone, Debug, PartialEq)]
pub enum Verification {
    Verified {
        github: GithubAccount,
        agent: String,
        signed_at: DateTime<Utc>,
    },
    Failed {
        reason: VerifyFailure,
    },
}

impl Verification {
    pub fn failed(reason: VerifyFailure) -> Self {
        Self::Failed { reason }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// Why an envelope failed verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyFailure {
    /// The envelope or its token could not be parsed.
    Malformed(String),
    /// The token header names an algorithm other than EdDSA.
    UnsupportedAlgorithm(String),
    /// The Ed25519 signature does not match the signing input.
    InvalidSignature,
    /// Recomputed content hash differs from the signed claim.
    HashMismatch,
    /// Token issuer does not match the envelope's account name.
    IssuerMismatch,
    /// `iat` falls outside the accepted freshness window.
    Expired,
    /// No public key is registered for the account.
    UnknownAccount,
    /// An unexpected fault inside the verifier.
    Internal(String),
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "Malformed envelope: {detail}"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "Invalid algorithm: {alg}"),
            Self::InvalidSignature => write!(f, "Signature verification failed"),
            Self::HashMismatch => write!(f, "Content hash mismatch"),
            Self::IssuerMismatch => write!(f, "Issuer mismatch"),
            Self::Expired => write!(f, "Timestamp outside valid window"),
            Self::UnknownAccount => write!(f, "Public key not found"),
            Self::Internal(detail) => write!(f, "Verification failed: {detail}"),
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────

/// A registry record for an account's current public key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredKey {
    pub github: String,
    pub public_key: PublicJwk,
    pub registered_at: String,
}

// ─── Device Flow ─────────────────────────────────────────────────

/// Response to a device-code request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Minimum seconds between token polls.
    pub interval: u64,
}

/// A granted access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceFlowResult {
    pub access_token: String,
    pub token_type: String,
}
