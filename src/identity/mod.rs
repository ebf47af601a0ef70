//! Identity Provisioning
//!
//! Creating and loading the keypair-backed identity that ties an agent's
//! output to a GitHub account.

pub mod provision;

pub use provision::{create_identity, load_identity};
