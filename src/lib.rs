//! SecretZero: end-to-end encrypted credential deposits.
//!
//! Clients encrypt a credential set under the server's RSA public key
//! (`crypto`).  The server checks the member's session, decrypts, names
//! the secrets after the application (`naming`), writes them to a
//! write-only vault without overwriting anything (`vault`), and sends a
//! signed, value-free notification (`webhook`).  `deposit` sequences
//! those steps.

#[cfg(feature = "audit-log")]
pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod deposit;
pub mod errors;
pub mod naming;
pub mod vault;
pub mod webhook;
