//! Vault module: write-only secret storage.
//!
//! This module provides:
//! - `SecretRecord`, `VaultSecret` and `DepositResult` types (`secret`)
//! - The remote API boundary and its HTTP client handle (`client`)
//! - Folder provisioning and collision-safe secret writes (`writer`)

pub mod client;
pub mod secret;
pub mod writer;

// Re-export the most commonly used items.
pub use client::{ApiOutcome, VaultApi, VaultClient, VaultConfig};
pub use secret::{DepositResult, SecretRecord, SensitiveJson, VaultSecret};
pub use writer::VaultWriter;
