//! Linked-account api key decryption
//!
//! Vendor api keys for workspace-linked accounts are stored as a
//! one-time-pad ciphertext alongside the pad itself; both arrive
//! base64-encoded. Decryption is a straight XOR.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("invalid base64 in {0}")]
    InvalidBase64(&'static str),

    #[error("ciphertext and OTP key must be the same length")]
    LengthMismatch,

    #[error("decrypted key is not valid UTF-8")]
    NotUtf8,
}

/// Decrypt a base64-encoded OTP ciphertext with its base64-encoded pad
pub fn decrypt_api_key(ciphertext_b64: &str, otp_key_b64: &str) -> Result<String, SecretsError> {
    let ciphertext = BASE64
        .decode(ciphertext_b64)
        .map_err(|_| SecretsError::InvalidBase64("ciphertext"))?;
    let otp_key = BASE64
        .decode(otp_key_b64)
        .map_err(|_| SecretsError::InvalidBase64("OTP key"))?;

    if ciphertext.len() != otp_key.len() {
        return Err(SecretsError::LengthMismatch);
    }

    let plaintext: Vec<u8> = ciphertext
        .iter()
        .zip(otp_key.iter())
        .map(|(c, k)| c ^ k)
        .collect();

    String::from_utf8(plaintext).map_err(|_| SecretsError::NotUtf8)
}
