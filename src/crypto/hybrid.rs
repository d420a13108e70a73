//! Hybrid encryption: AES-256-GCM for the record, RSA-OAEP for the key.
//!
//! RSA-OAEP with SHA-256 on a 2048-bit modulus can carry at most ~190
//! bytes, which is too small for a credential set.  So the record is
//! sealed under a single-use AES key, and only that key is wrapped with
//! the recipient's public key.
//!
//! Flow:
//! 1. Generate a random AES-256 session key and a 12-byte IV
//! 2. Serialize the record to JSON and seal it (tag appended)
//! 3. Wrap the session key with RSA-OAEP(SHA-256)
//! 4. Ship `{ encryptedData, encryptedKey, iv }` as base64 text

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use super::encryption::{generate_nonce, open, seal};
use super::keys::SessionKey;
use crate::errors::{Result, SecretZeroError};

/// Encrypted payload as it travels over the wire.  All fields are base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// AES-GCM ciphertext with the 16-byte tag appended.
    pub encrypted_data: String,
    /// Session key wrapped with RSA-OAEP(SHA-256).
    pub encrypted_key: String,
    /// 12-byte GCM nonce.
    pub iv: String,
}

/// Encrypt any serializable `record` for the holder of `public_key`.
pub fn encrypt<T: Serialize + ?Sized>(record: &T, public_key: &RsaPublicKey) -> Result<EncryptedPayload> {
    let session_key = SessionKey::generate();
    let iv = generate_nonce();

    let plaintext = Zeroizing::new(
        serde_json::to_vec(record)
            .map_err(|e| SecretZeroError::SerializationError(format!("record: {e}")))?,
    );
    let encrypted_data = seal(session_key.as_bytes(), &iv, &plaintext)?;

    let encrypted_key = public_key
        .encrypt(&mut aes_gcm::aead::OsRng, Oaep::new::<Sha256>(), session_key.as_bytes())
        .map_err(|e| SecretZeroError::EncryptionFailed(format!("key wrap: {e}")))?;

    Ok(EncryptedPayload {
        encrypted_data: BASE64.encode(encrypted_data),
        encrypted_key: BASE64.encode(encrypted_key),
        iv: BASE64.encode(iv),
    })
}

/// Decrypt a payload to its raw JSON bytes (zeroized on drop).
///
/// Every failure collapses into `DecryptionFailed`; the failing step is
/// only visible in debug logs.
pub fn decrypt_bytes(payload: &EncryptedPayload, private_key: &RsaPrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    let encrypted_data = decode_field(&payload.encrypted_data, "encryptedData")?;
    let encrypted_key = decode_field(&payload.encrypted_key, "encryptedKey")?;
    let iv = decode_field(&payload.iv, "iv")?;

    let unwrapped = Zeroizing::new(
        private_key
            .decrypt(Oaep::new::<Sha256>(), &encrypted_key)
            .map_err(|_| opaque("unwrap_key"))?,
    );
    let session_key = SessionKey::from_slice(&unwrapped).ok_or_else(|| opaque("session_key_length"))?;

    open(session_key.as_bytes(), &iv, &encrypted_data).map_err(|_| opaque("aead_open"))
}

/// Decrypt a payload and parse it as JSON into `T`.
pub fn decrypt<T: DeserializeOwned>(payload: &EncryptedPayload, private_key: &RsaPrivateKey) -> Result<T> {
    let plaintext = decrypt_bytes(payload, private_key)?;
    serde_json::from_slice(&plaintext).map_err(|_| opaque("parse_json"))
}

fn decode_field(value: &str, field: &'static str) -> Result<Vec<u8>> {
    BASE64.decode(value.trim()).map_err(|_| {
        debug!(field, "payload field is not valid base64");
        SecretZeroError::DecryptionFailed
    })
}

fn opaque(step: &'static str) -> SecretZeroError {
    debug!(step, "hybrid decryption failed");
    SecretZeroError::DecryptionFailed
}
