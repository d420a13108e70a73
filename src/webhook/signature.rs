//! HMAC-SHA256 webhook signatures, hex encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a raw HMAC-SHA256 tag.
pub const SIGNATURE_LEN: usize = 32;

/// Sign `payload` with `secret`.  Returns 64 lowercase hex characters.
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    hex::encode(mac_bytes(payload, secret))
}

/// Check `signature_hex` against the expected signature for `payload`.
///
/// Non-hex input and signatures of the wrong length are rejected without
/// comparing; otherwise the comparison runs in constant time.
pub fn verify(payload: &[u8], signature_hex: &str, secret: &[u8]) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let expected = mac_bytes(payload, secret);

    if provided.len() != expected.len() {
        return false;
    }

    provided.ct_eq(&expected).into()
}

fn mac_bytes(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}
