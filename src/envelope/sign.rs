//! Envelope Signing
//!
//! Builds the claim set, signs it as a compact EdDSA token, and wraps it
//! together with the verbatim content. Pure except for the clock and the
//! per-call nonce; never mutates the identity or stored keys.

use chrono::Utc;
use uuid::Uuid;

use crate::crypto;
use crate::error::Result;
use crate::jws::{self, ClaimSet, ProtectedHeader, JWS_ALG, JWS_TYP};
use crate::types::{Envelope, EnvelopeMeta, SignIdentity, SignOptions};

/// Envelope protocol version.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Issuer suffix binding a claim set to this protocol.
pub const ISSUER_SUFFIX: &str = "@agentcred";

const DEFAULT_AGENT: &str = "default";
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Sign `content` on behalf of `identity`.
///
/// Signing the same content twice yields distinct signatures (fresh `iat`
/// and nonce) over an identical content hash.
pub fn sign(
    content: &str,
    identity: &SignIdentity,
    options: Option<SignOptions>,
) -> Result<Envelope> {
    let options = options.unwrap_or_default();
    let agent = options.agent.unwrap_or_else(|| DEFAULT_AGENT.to_string());
    let content_type = options
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let issuer = format!("{}{}", identity.github, ISSUER_SUFFIX);
    let claims = ClaimSet {
        iss: issuer.clone(),
        sub: agent.clone(),
        iat: Utc::now().timestamp(),
        content_hash: format!("sha256:{}", crypto::sha256_hex(content.as_bytes())),
        content_type,
        nonce: Uuid::new_v4().to_string(),
    };
    let header = ProtectedHeader {
        alg: JWS_ALG.to_string(),
        typ: JWS_TYP.to_string(),
        kid: issuer,
    };

    let token = jws::sign_compact(&header, &claims, &identity.signing_key)?;

    Ok(Envelope {
        agentcred: EnvelopeMeta {
            v: PROTOCOL_VERSION.to_string(),
            jws: token,
            github: identity.github.clone(),
            agent,
        },
        content: content.to_string(),
    })
}
