//! AEAD envelope around an encoded batch: `nonce(12) || ciphertext || tag(16)`,
//! AES-256-GCM, a 256-bit pre-shared key, empty AAD.
//!
//! There is no handshake here: the key is a static, operator-provisioned
//! secret loaded once at startup, so this module reaches for `aes-gcm`
//! directly rather than negotiating a session.

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const ENVELOPE_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

#[derive(thiserror::Error, Debug)]
pub enum CipherError {
    #[error("envelope truncated: need at least {ENVELOPE_OVERHEAD} bytes, got {0}")]
    EnvelopeTruncated(usize),
    #[error("authentication failed")]
    AuthFailed,
}

#[derive(thiserror::Error, Debug)]
pub enum KeyError {
    #[error("could not read key file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("key file {path} has {got} bytes, expected {KEY_LEN}")]
    WrongLength { path: String, got: usize },
}

/// A loaded pre-shared key. Zeroized on drop; the raw bytes never leave this
/// module except through [`Key::cipher`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, KeyError> {
        let raw = fs::read(path).map_err(|source| KeyError::Io { path: path.display().to_string(), source })?;
        if raw.len() != KEY_LEN {
            return Err(KeyError::WrongLength { path: path.display().to_string(), got: raw.len() });
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new_from_slice(&self.0).expect("key is exactly KEY_LEN bytes")
    }
}

/// Seals `plaintext` under `key`, generating a fresh random nonce.
pub fn seal(key: &Key, plaintext: &[u8]) -> Vec<u8> {
    let cipher = key.cipher();
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .expect("AES-256-GCM encryption over a bounded plaintext cannot fail");

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(nonce.as_slice());
    envelope.extend_from_slice(&ciphertext);
    envelope
}

/// Opens an envelope produced by [`seal`]. A single [`CipherError::AuthFailed`]
/// covers both tag mismatch and any internal decrypt failure, so callers
/// can't learn *why* verification failed from the error variant alone.
pub fn open(key: &Key, envelope: &[u8]) -> Result<Vec<u8>, CipherError> {
    if envelope.len() < ENVELOPE_OVERHEAD {
        return Err(CipherError::EnvelopeTruncated(envelope.len()));
    }

    let (nonce_bytes, rest) = envelope.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = key.cipher();
    cipher.decrypt(nonce, rest).map_err(|_| CipherError::AuthFailed)
}
