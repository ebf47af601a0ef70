//! AgentCred Error Taxonomy
//!
//! Hard failures during identity creation, storage, and the device flow are
//! errors; verification outcomes are never errors (see `types::Verification`).

use thiserror::Error;

/// Errors raised by identity, storage, registry, and OAuth operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The identity provider rejected the supplied token.
    #[error("GitHub authentication failed: {0}")]
    Authentication(String),

    /// The registry rejected a public-key registration.
    #[error("key registration failed: {0}")]
    Registration(String),

    /// Malformed input, rejected before any I/O is attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Key material that cannot be decoded into an Ed25519 key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The device-authorization flow terminated without a token.
    #[error(transparent)]
    DeviceFlow(#[from] DeviceFlowError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Terminal states of the device-authorization flow, excluding success.
#[derive(Debug, Error)]
pub enum DeviceFlowError {
    /// The device code expired before the user authorized it.
    #[error("device code expired")]
    Expired,

    /// The user denied the authorization request.
    #[error("user denied authorization")]
    Denied,

    /// The provider returned an unrecognized error code.
    #[error("OAuth error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, Error>;
