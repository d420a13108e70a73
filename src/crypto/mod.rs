//! Cryptographic primitives for SecretZero.
//!
//! This module provides:
//! - AES-256-GCM sealing and opening with a detached-tag split (`encryption`)
//! - RSA-2048 key pairs and single-use AES session keys (`keys`)
//! - The hybrid AES-GCM + RSA-OAEP payload scheme (`hybrid`)

pub mod encryption;
pub mod hybrid;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, generate_key_pair, ...};
pub use hybrid::{decrypt, decrypt_bytes, encrypt, EncryptedPayload};
pub use keys::{generate_key_pair, load_private_key, load_public_key, KeyPairPem, SessionKey};
