//! AES-256-GCM authenticated encryption.
//!
//! Unlike a self-describing blob, the nonce travels separately (as the
//! payload's `iv`), so `seal` takes it as an argument and `open` expects
//! it back.  The 16-byte authentication tag is appended to the
//! ciphertext, matching what WebCrypto produces:
//!   [ ciphertext | 16-byte auth tag ]

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::Zeroizing;

use crate::errors::{Result, SecretZeroError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Generate a fresh random 96-bit nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` with a 32-byte `key` under the given nonce.
///
/// Returns the ciphertext with the authentication tag appended.
pub fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(SecretZeroError::EncryptionFailed(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| SecretZeroError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| SecretZeroError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Decrypt data produced by `seal`.
///
/// Splits the trailing tag off, decrypts in place and verifies the tag.
/// Any problem (short input, wrong nonce length, bad key, tag mismatch)
/// yields `DecryptionFailed`.  The plaintext is zeroized when dropped.
pub fn open(key: &[u8], nonce: &[u8], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_LEN || sealed.len() < TAG_LEN {
        return Err(SecretZeroError::DecryptionFailed);
    }

    let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SecretZeroError::DecryptionFailed)?;

    let mut buffer = Zeroizing::new(body.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| SecretZeroError::DecryptionFailed)?;

    Ok(buffer)
}
