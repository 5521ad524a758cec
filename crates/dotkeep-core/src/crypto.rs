//! Password-based AES-256-GCM encryption of the backup archive.
//!
//! The key is derived with PBKDF2-HMAC-SHA256. Salt and nonce are stored in
//! the recipe as hex strings; together with the password they are all that
//! is needed to decrypt a backup.

use crate::error::DotkeepError;
use crate::error::Result;
use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

/// PBKDF2 rounds. Changing this makes existing backups undecryptable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
pub const SALT_SIZE: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Derived key length in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// A 256-bit key wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derives a key from `password`.
///
/// If `existing_salt_hex` decodes to exactly [`SALT_SIZE`] bytes it is
/// reused, otherwise a fresh random salt is generated. Returns the key and
/// the hex salt that produced it.
pub fn derive_key(password: &str, existing_salt_hex: &str) -> (DerivedKey, String) {
    let salt = match hex::decode(existing_salt_hex) {
        Ok(bytes) if bytes.len() == SALT_SIZE => bytes,
        _ => {
            debug!("generating fresh key derivation salt");
            random_bytes(SALT_SIZE)
        }
    };

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);
    let derived = DerivedKey::from_bytes(key);
    key.zeroize();

    (derived, hex::encode(salt))
}

/// Encrypts `plaintext` under a fresh random nonce.
///
/// Returns the ciphertext (tag appended) and the hex nonce.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> Result<(Vec<u8>, String)> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| DotkeepError::Io(std::io::Error::other(format!("cipher setup: {e}"))))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| DotkeepError::Io(std::io::Error::other("encryption failed")))?;

    Ok((ciphertext, hex::encode(nonce_bytes)))
}

/// Decrypts and authenticates `ciphertext`.
///
/// # Errors
///
/// Returns `Authentication` if the nonce is not [`NONCE_SIZE`] bytes of hex
/// or the tag does not verify (wrong password, corrupted data).
pub fn decrypt(key: &DerivedKey, nonce_hex: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let nonce_bytes = hex::decode(nonce_hex)
        .map_err(|e| DotkeepError::authentication(format!("invalid nonce encoding: {e}")))?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(DotkeepError::authentication(format!(
            "invalid nonce size: expected {NONCE_SIZE}, got {}",
            nonce_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| DotkeepError::authentication(format!("cipher setup: {e}")))?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| DotkeepError::authentication("wrong password or corrupted backup"))
}

/// A fresh hex-encoded salt.
#[must_use]
pub fn random_salt_hex() -> String {
    hex::encode(random_bytes(SALT_SIZE))
}

/// A fresh hex-encoded nonce.
#[must_use]
pub fn random_nonce_hex() -> String {
    hex::encode(random_bytes(NONCE_SIZE))
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
