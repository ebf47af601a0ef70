//! AgentCred -- Human Accountability for AI Agents
//!
//! Lets an autonomous agent produce content that is cryptographically
//! attributable to a human-controlled GitHub account, and lets any third
//! party verify that attribution without trusting the agent. Content is
//! signed, not encrypted; the public-key registry is a best-effort lookup
//! service, not a trust root for anything beyond name→key mapping.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod jws;
pub mod oauth;
pub mod registry;
pub mod storage;
pub mod types;

pub use config::AgentCredConfig;
pub use envelope::{sign, sign_with_html, verify, verify_offline};
pub use error::{DeviceFlowError, Error, Result};
pub use identity::{create_identity, load_identity};
pub use oauth::{poll_for_access_token, request_device_code, start_device_flow};
pub use registry::resolve_public_key;
pub use storage::{FsKeyStore, KeyStore, MemoryKeyStore};
pub use types::{
    DeviceCodeResponse, DeviceFlowResult, Envelope, EnvelopeMeta, GithubAccount, Identity,
    LoadedIdentity, SignIdentity, SignOptions, Verification, VerifyFailure,
};
