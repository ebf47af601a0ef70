//! Compact JWS Encoding
//!
//! The envelope signature is a three-segment compact token
//! (`base64url(header).base64url(claims).base64url(signature)`) signed with
//! EdDSA over Ed25519. Only the claim hash binds the content; the verifier
//! recomputes it from the envelope's companion content field.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The only signature algorithm this protocol accepts.
pub const JWS_ALG: &str = "EdDSA";

/// Token type carried in the protected header.
pub const JWS_TYP: &str = "agentcred+jwt";

/// Protected header of the compact token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub alg: String,
    pub typ: String,
    pub kid: String,
}

/// Claims embedded in the signed token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimSet {
    /// `<account>@agentcred`
    pub iss: String,
    /// Agent name.
    pub sub: String,
    /// Unix seconds at signing time.
    pub iat: i64,
    /// `sha256:<hex>` over the envelope content.
    pub content_hash: String,
    pub content_type: String,
    /// Random per-signature value; makes otherwise-identical signatures
    /// distinct. Not checked by verifiers.
    pub nonce: String,
}

/// A parsed compact token, with the raw signing input retained so the
/// signature can be checked against exactly the bytes that were signed.
#[derive(Debug)]
pub struct DecodedJws {
    pub header: ProtectedHeader,
    pub claims: ClaimSet,
    signing_input: String,
    signature: Signature,
}

impl DecodedJws {
    /// Check the Ed25519 signature over the original signing input.
    pub fn verify_signature(&self, key: &VerifyingKey) -> bool {
        key.verify(self.signing_input.as_bytes(), &self.signature)
            .is_ok()
    }
}

/// Serialize and sign header + claims into a compact token.
pub fn sign_compact(
    header: &ProtectedHeader,
    claims: &ClaimSet,
    key: &SigningKey,
) -> Result<String> {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = key.sign(signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Parse a compact token without verifying it.
///
/// Fails on anything that is not three base64url segments carrying a JSON
/// header, JSON claims, and a 64-byte signature.
pub fn decode_compact(token: &str) -> Result<DecodedJws> {
    let mut segments = token.split('.');
    let (header_b64, claims_b64, signature_b64) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => {
                return Err(Error::Validation(
                    "compact token must have exactly three segments".to_string(),
                ))
            }
        };

    let header: ProtectedHeader = serde_json::from_slice(&decode_segment(header_b64, "header")?)?;
    let claims: ClaimSet = serde_json::from_slice(&decode_segment(claims_b64, "claims")?)?;

    let signature_bytes = decode_segment(signature_b64, "signature")?;
    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| Error::Validation(format!("bad signature encoding: {e}")))?;

    Ok(DecodedJws {
        header,
        claims,
        signing_input: format!("{header_b64}.{claims_b64}"),
        signature,
    })
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| Error::Validation(format!("bad base64url in {name}: {e}")))
}
