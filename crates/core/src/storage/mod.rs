//! Encrypted at-rest snapshot of the ledger.
//!
//! The cash series is extended incrementally, so the whole ledger state
//! (configuration, transaction log, and the three built tables) is persisted
//! between runs. Layout:
//!
//! ```text
//! [PFLG: 4B] [version: 2B LE] [salt: 16B] [nonce: 12B] [ciphertext…]
//! ```
//!
//! The payload is bincode, encrypted with AES-256-GCM under an Argon2id-derived
//! key. KDF parameters are fixed per format version rather than stored in the
//! header; bumping them means bumping the version.

use std::path::Path;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::models::transaction::Transaction;
use crate::store::LedgerStore;

/// Magic bytes identifying a portfolio ledger file.
pub const MAGIC: &[u8; 4] = b"PFLG";

/// Current file format version.
pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2) + salt(16) + nonce(12)
const HEADER_SIZE: usize = 34;

/// AES-GCM appends a 16-byte authentication tag to every ciphertext.
const GCM_TAG_SIZE: usize = 16;

// Argon2id cost parameters for format version 1.
const KDF_MEMORY_KIB: u32 = 65_536; // 64 MB
const KDF_ITERATIONS: u32 = 3;
const KDF_PARALLELISM: u32 = 4;

/// Everything needed to resume the ledger in a later process: the account
/// configuration, the append-only transaction log, and the built tables
/// (so the incremental cash build picks up where it left off).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub base_currency: String,
    pub initial_cash: f64,
    pub transactions: Vec<Transaction>,
    pub store: LedgerStore,
}

/// Serialize and encrypt a ledger state to portable bytes.
pub fn save_to_bytes(state: &LedgerState, password: &str) -> Result<Vec<u8>, LedgerError> {
    let plaintext = bincode::serialize(state)
        .map_err(|e| LedgerError::Serialization(format!("Failed to serialize ledger: {e}")))?;

    let salt = random_bytes::<16>()?;
    let nonce = random_bytes::<12>()?;
    let key = derive_key(password, &salt)?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| LedgerError::Encryption(format!("Failed to create cipher: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|e| LedgerError::Encryption(format!("Encryption failed: {e}")))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&CURRENT_VERSION.to_le_bytes());
    buf.extend_from_slice(&salt);
    buf.extend_from_slice(&nonce);
    buf.extend_from_slice(&ciphertext);
    Ok(buf)
}

/// Decrypt and deserialize a ledger state from bytes produced by
/// [`save_to_bytes`]. A wrong password or tampered data yields
/// `LedgerError::Decryption`.
pub fn load_from_bytes(data: &[u8], password: &str) -> Result<LedgerState, LedgerError> {
    if data.len() < HEADER_SIZE + GCM_TAG_SIZE {
        return Err(LedgerError::InvalidFileFormat(
            "File too small to be a valid ledger file".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(LedgerError::InvalidFileFormat(
            "Invalid magic bytes — not a ledger file".into(),
        ));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version == 0 || version > CURRENT_VERSION {
        return Err(LedgerError::UnsupportedVersion(version));
    }

    let mut salt = [0u8; 16];
    salt.copy_from_slice(&data[6..22]);
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&data[22..34]);
    let ciphertext = &data[HEADER_SIZE..];

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| LedgerError::Encryption(format!("Failed to create cipher: {e}")))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map_err(|_| LedgerError::Decryption)?;

    bincode::deserialize(&plaintext)
        .map_err(|e| LedgerError::Serialization(format!("Failed to deserialize ledger: {e}")))
}

/// Save the ledger state to an encrypted file on disk.
pub fn save_to_file(
    state: &LedgerState,
    path: impl AsRef<Path>,
    password: &str,
) -> Result<(), LedgerError> {
    let bytes = save_to_bytes(state, password)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Load the ledger state from an encrypted file on disk.
pub fn load_from_file(path: impl AsRef<Path>, password: &str) -> Result<LedgerState, LedgerError> {
    let bytes = std::fs::read(path)?;
    load_from_bytes(&bytes, password)
}

/// Derive a 256-bit key from the password with Argon2id, using the cost
/// parameters fixed for the current format version.
fn derive_key(password: &str, salt: &[u8; 16]) -> Result<[u8; 32], LedgerError> {
    let params = Params::new(KDF_MEMORY_KIB, KDF_ITERATIONS, KDF_PARALLELISM, Some(32))
        .map_err(|e| LedgerError::Encryption(format!("Invalid Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| LedgerError::Encryption(format!("Key derivation failed: {e}")))?;
    Ok(key)
}

fn random_bytes<const N: usize>() -> Result<[u8; N], LedgerError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf)
        .map_err(|e| LedgerError::Encryption(format!("Failed to generate random bytes: {e}")))?;
    Ok(buf)
}
