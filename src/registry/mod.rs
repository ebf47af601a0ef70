//! Public-Key Registry Access
//!
//! Thin client for the registry's two endpoints. The registry is a
//! best-effort, eventually-consistent lookup service; nothing here retries.

pub mod client;

pub use client::{resolve_public_key, RegistryClient};
