//! Ed25519 Key Material and Hashing
//!
//! Keys cross the wire as JWK objects (`kty: "OKP"`, `crv: "Ed25519"`), with
//! the public coordinate in `x` and the private scalar in `d`, both
//! base64url-encoded without padding. Fingerprints are SHA-256 over the
//! canonical JSON serialization of the public JWK.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// JWK key type for Ed25519 octet key pairs.
pub const JWK_KTY: &str = "OKP";

/// JWK curve identifier.
pub const JWK_CRV: &str = "Ed25519";

/// Public half of an Ed25519 keypair in JWK form.
///
/// Field order is the canonical serialization order; `fingerprint` depends
/// on it staying stable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
}

/// Private Ed25519 key in JWK form, as persisted by the key store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrivateJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub d: String,
}

impl PublicJwk {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self {
            kty: JWK_KTY.to_string(),
            crv: JWK_CRV.to_string(),
            x: URL_SAFE_NO_PAD.encode(key.as_bytes()),
        }
    }

    /// Decode into a verifying key, rejecting non-Ed25519 JWKs.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey> {
        check_jwk_type(&self.kty, &self.crv)?;
        let bytes = decode_fixed::<PUBLIC_KEY_LENGTH>(&self.x, "x")?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::InvalidKey(format!("bad public key: {e}")))
    }
}

impl PrivateJwk {
    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self {
            kty: JWK_KTY.to_string(),
            crv: JWK_CRV.to_string(),
            x: URL_SAFE_NO_PAD.encode(key.verifying_key().as_bytes()),
            d: URL_SAFE_NO_PAD.encode(key.as_bytes()),
        }
    }

    /// Decode into a signing key, rejecting non-Ed25519 JWKs.
    pub fn to_signing_key(&self) -> Result<SigningKey> {
        check_jwk_type(&self.kty, &self.crv)?;
        let seed = Zeroizing::new(decode_fixed::<SECRET_KEY_LENGTH>(&self.d, "d")?);
        Ok(SigningKey::from_bytes(&seed))
    }

    /// The public portion, for fingerprinting a stored private key.
    pub fn public_jwk(&self) -> PublicJwk {
        PublicJwk {
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
        }
    }
}

fn check_jwk_type(kty: &str, crv: &str) -> Result<()> {
    if kty != JWK_KTY || crv != JWK_CRV {
        return Err(Error::InvalidKey(format!(
            "unsupported key type {kty}/{crv}, expected {JWK_KTY}/{JWK_CRV}"
        )));
    }
    Ok(())
}

fn decode_fixed<const N: usize>(value: &str, field: &str) -> Result<[u8; N]> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| Error::InvalidKey(format!("bad base64url in {field}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| Error::InvalidKey(format!("wrong length for {field}, expected {N} bytes")))
}

/// Generate a fresh Ed25519 signing key from the OS RNG.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Fingerprint of a public key: hex SHA-256 over its canonical JSON form.
///
/// Recomputed wherever it is needed; never cached across a key change.
pub fn fingerprint(public_key: &PublicJwk) -> Result<String> {
    let canonical = serde_json::to_string(public_key)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Constant-time equality for digest comparison.
///
/// Differing lengths compare unequal without inspecting contents.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwk_round_trip() {
        let key = generate_signing_key();
        let private = PrivateJwk::from_signing_key(&key);
        let restored = private.to_signing_key().unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());

        let public = PublicJwk::from_verifying_key(&key.verifying_key());
        let verifying = public.to_verifying_key().unwrap();
        assert_eq!(verifying, key.verifying_key());
        assert_eq!(private.public_jwk(), public);
    }

    #[test]
    fn test_rejects_wrong_curve() {
        let key = generate_signing_key();
        let mut public = PublicJwk::from_verifying_key(&key.verifying_key());
        public.crv = "P-256".to_string();
        assert!(matches!(
            public.to_verifying_key(),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_coordinate() {
        let key = generate_signing_key();
        let mut public = PublicJwk::from_verifying_key(&key.verifying_key());
        public.x.truncate(10);
        assert!(public.to_verifying_key().is_err());
    }

    #[test]
    fn test_fingerprint_is_stable_per_key() {
        let key = generate_signing_key();
        let public = PublicJwk::from_verifying_key(&key.verifying_key());
        let a = fingerprint(&public).unwrap();
        let b = fingerprint(&public).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = PublicJwk::from_verifying_key(&generate_signing_key().verifying_key());
        assert_ne!(a, fingerprint(&other).unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abcd", b"abcd"));
        assert!(!constant_time_eq(b"abcd", b"abce"));
        assert!(!constant_time_eq(b"abcd", b"abc"));
        assert!(constant_time_eq(b"", b""));
    }
}
