//! Signed Envelopes
//!
//! Building envelopes from content + identity, and verifying them against a
//! public key supplied directly or resolved through the registry.

pub mod html;
pub mod sign;
pub mod verify;

pub use html::sign_with_html;
pub use sign::sign;
pub use verify::{verify, verify_offline};
