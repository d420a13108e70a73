//! Key material: RSA-2048 key pairs and single-use AES session keys.
//!
//! The RSA pair is generated once (operational utility) and stored as
//! PEM: SPKI for the public half, PKCS#8 for the private half.  The
//! session key is generated per payload, wrapped under the public key,
//! and never persisted.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{Result, SecretZeroError};

/// Length of the AES-256 session key (256 bits).
pub const SESSION_KEY_LEN: usize = 32;

/// RSA modulus size used for key generation.
pub const RSA_BITS: usize = 2048;

/// A 32-byte AES session key that zeroes its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    bytes: [u8; SESSION_KEY_LEN],
}

impl SessionKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Rebuild a key from unwrapped bytes.  Returns `None` on a length mismatch.
    pub fn from_slice(raw: &[u8]) -> Option<Self> {
        if raw.len() != SESSION_KEY_LEN {
            return None;
        }
        let mut bytes = [0u8; SESSION_KEY_LEN];
        bytes.copy_from_slice(raw);
        Some(Self { bytes })
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.bytes
    }
}

/// A freshly generated PEM-encoded key pair.
pub struct KeyPairPem {
    /// SPKI PEM, safe to hand to clients.
    pub public_pem: String,
    /// PKCS#8 PEM, zeroized on drop.
    pub private_pem: Zeroizing<String>,
}

/// Generate a 2048-bit RSA key pair.
pub fn generate_key_pair() -> Result<KeyPairPem> {
    let private_key = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
        .map_err(|e| SecretZeroError::KeyGenerationFailed(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| SecretZeroError::KeyGenerationFailed(format!("private key PEM: {e}")))?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| SecretZeroError::KeyGenerationFailed(format!("public key PEM: {e}")))?;

    Ok(KeyPairPem {
        public_pem,
        private_pem,
    })
}

/// Parse an SPKI PEM public key, rejecting moduli under 2048 bits.
pub fn load_public_key(pem: &str) -> Result<RsaPublicKey> {
    let key = RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| SecretZeroError::InvalidKey(format!("public key: {e}")))?;

    if key.size() * 8 < RSA_BITS {
        return Err(SecretZeroError::InvalidKey(format!(
            "public key is {} bits, need at least {RSA_BITS}",
            key.size() * 8
        )));
    }

    Ok(key)
}

/// Parse a private key in PKCS#8 PEM (falls back to PKCS#1 `RSA PRIVATE KEY`).
///
/// The parse error is not echoed back since it could hint at key contents.
pub fn load_private_key(pem: &str) -> Result<RsaPrivateKey> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| SecretZeroError::InvalidKey("private key is not valid PKCS#8 or PKCS#1 PEM".into()))
}
