//! Payload encryption for uploads.
//!
//! Templates can ask for an image to be encrypted before it leaves the
//! machine. The output is a self-describing container:
//!
//! ```text
//! | magic "WIC1" | version | salt (16) | nonce (12) | AES-256-GCM ciphertext |
//! ```
//!
//! The key is derived from the user's cipher password with Argon2id, so the
//! container can be decrypted later with nothing but the password.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};
use argon2::Argon2;

/// File extension appended to encrypted uploads.
pub const ENCRYPTED_EXT: &str = ".enc";

const MAGIC: &[u8; 4] = b"WIC1";
const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;

pub const ARGON2_MEM_COST: u32 = 65536; // 64MB
pub const ARGON2_TIME_COST: u32 = 3;
pub const ARGON2_PARALLELISM: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Encryption failed")]
    Encrypt,
    #[error("Decryption failed (wrong password or corrupted data)")]
    Decrypt,
    #[error("Not an encrypted image container")]
    BadContainer,
}

/// Derive a 256-bit key from password + salt using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32], CryptoError> {
    let params = argon2::Params::new(
        ARGON2_MEM_COST,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(32),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2 derive: {}", e)))?;
    Ok(key)
}

/// Generate cryptographically secure random bytes using OS entropy
fn random_bytes(len: usize) -> Vec<u8> {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Encrypt an image payload into a container that [`decrypt_payload`] can
/// open with the same password.
pub fn encrypt_payload(password: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let salt = random_bytes(SALT_LEN);
    let nonce = random_bytes(NONCE_LEN);
    let key = derive_key(password, &salt)?;

    let cipher = Aes256Gcm::new(GenericArray::from_slice(&key));
    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Encrypt)?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a container produced by [`encrypt_payload`].
pub fn decrypt_payload(password: &str, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < HEADER_LEN || &data[..MAGIC.len()] != MAGIC {
        return Err(CryptoError::BadContainer);
    }
    if data[MAGIC.len()] != VERSION {
        return Err(CryptoError::BadContainer);
    }

    let salt = &data[MAGIC.len() + 1..MAGIC.len() + 1 + SALT_LEN];
    let nonce = &data[MAGIC.len() + 1 + SALT_LEN..HEADER_LEN];
    let ciphertext = &data[HEADER_LEN..];

    let key = derive_key(password, salt)?;
    let cipher = Aes256Gcm::new(GenericArray::from_slice(&key));
    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt)
}
