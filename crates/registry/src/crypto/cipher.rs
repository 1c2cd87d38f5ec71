//! AES-256-GCM-SIV encryption and decryption of individual string fields.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! Each call still draws a fresh random nonce, so two encryptions of the same
//! plaintext produce different blobs. Never compare blobs for equality; use
//! [`super::digest`] instead.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use super::key::KeyMaterial;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Leading byte of every non-empty blob.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum number of characters shown by [`EncryptedBlob::preview`].
const PREVIEW_CHARS: usize = 50;

/// Opaque authenticated ciphertext as stored in the database.
///
/// Layout: `version (1) ‖ nonce (12) ‖ ciphertext + tag`. The empty blob is
/// the sentinel for "no value" and is not a valid ciphertext.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EncryptedBlob(Vec<u8>);

impl EncryptedBlob {
    /// The "no value" sentinel.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 rendering for display, truncated to 50 characters with `...`.
    pub fn preview(&self) -> String {
        if self.0.is_empty() {
            return "-".into();
        }
        let encoded = STANDARD.encode(&self.0);
        if encoded.len() > PREVIEW_CHARS {
            format!("{}...", &encoded[..PREVIEW_CHARS])
        } else {
            encoded
        }
    }
}

impl From<Vec<u8>> for EncryptedBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptedBlob({} bytes)", self.0.len())
    }
}

/// Errors produced while encrypting.
#[derive(Debug, Error)]
pub enum CipherError {
    /// AES-GCM-SIV encryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Errors produced while decrypting a stored blob.
///
/// Messages describe the failure class only; they never include key material
/// or ciphertext bytes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionError {
    /// The blob is too short to hold a version byte, nonce and tag.
    #[error("malformed ciphertext ({0} bytes)")]
    Malformed(usize),

    /// The version byte is not one this build understands.
    #[error("unsupported ciphertext version {0}")]
    UnsupportedVersion(u8),

    /// Authentication failed: wrong key or tampered data.
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Field cipher bound to a single key for the life of the process.
pub struct Cipher {
    aead: Aes256GcmSiv,
}

impl Cipher {
    pub fn new(key: &KeyMaterial) -> Self {
        Self {
            aead: Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt a plaintext string field.
    ///
    /// An empty plaintext yields [`EncryptedBlob::empty`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should
    /// be unreachable with a valid key and nonce).
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedBlob, CipherError> {
        if plaintext.is_empty() {
            return Ok(EncryptedBlob::empty());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::AeadFailure)?;

        let mut out = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(EncryptedBlob(out))
    }

    /// Authenticate and decrypt a blob back to its original string.
    ///
    /// An empty blob yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns a [`DecryptionError`] if the blob is malformed, carries an
    /// unknown version, fails authentication, or is not UTF-8.
    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<String, DecryptionError> {
        if blob.is_empty() {
            return Ok(String::new());
        }
        if blob.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(DecryptionError::Malformed(blob.len()));
        }
        let bytes = blob.as_bytes();
        if bytes[0] != FORMAT_VERSION {
            return Err(DecryptionError::UnsupportedVersion(bytes[0]));
        }

        let (nonce_bytes, ciphertext) = bytes[1..].split_at(NONCE_LEN);
        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| DecryptionError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| DecryptionError::InvalidUtf8)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KEY_LEN;

    fn cipher() -> Cipher {
        Cipher::new(&KeyMaterial::generate())
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let c = cipher();
        for s in ["test@example.com", "1234567890", "Zoë Ångström ✓", " "] {
            let blob = c.encrypt(s).unwrap();
            assert_ne!(blob.as_bytes(), s.as_bytes());
            assert_eq!(c.decrypt(&blob).unwrap(), s);
        }
    }

    #[test]
    fn empty_input_is_empty_blob() {
        let c = cipher();
        let blob = c.encrypt("").unwrap();
        assert!(blob.is_empty());
        assert_eq!(c.decrypt(&EncryptedBlob::empty()).unwrap(), "");
    }

    #[test]
    fn same_plaintext_gives_distinct_blobs() {
        let c = cipher();
        let a = c.encrypt("existing@test.com").unwrap();
        let b = c.encrypt("existing@test.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let blob = cipher().encrypt("secret").unwrap();
        assert_eq!(
            cipher().decrypt(&blob),
            Err(DecryptionError::Authentication)
        );
    }

    #[test]
    fn deterministic_key_decrypts_across_instances() {
        let a = Cipher::new(&KeyMaterial::from_bytes([0x42; KEY_LEN]));
        let b = Cipher::new(&KeyMaterial::from_bytes([0x42; KEY_LEN]));
        let blob = a.encrypt("9876543210").unwrap();
        assert_eq!(b.decrypt(&blob).unwrap(), "9876543210");
    }

    #[test]
    fn flipping_any_byte_fails() {
        let c = cipher();
        let blob = c.encrypt("tamper me").unwrap();
        for i in 0..blob.len() {
            let mut bytes = blob.as_bytes().to_vec();
            bytes[i] ^= 0x01;
            assert!(
                c.decrypt(&EncryptedBlob::from(bytes)).is_err(),
                "flip at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn truncated_blob_is_malformed() {
        let c = cipher();
        let err = c.decrypt(&EncryptedBlob::from(vec![FORMAT_VERSION, 1, 2, 3]));
        assert_eq!(err, Err(DecryptionError::Malformed(4)));
    }

    #[test]
    fn unknown_version_rejected() {
        let c = cipher();
        let mut bytes = c.encrypt("x").unwrap().as_bytes().to_vec();
        bytes[0] = 9;
        assert_eq!(
            c.decrypt(&EncryptedBlob::from(bytes)),
            Err(DecryptionError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn preview_is_truncated() {
        let c = cipher();
        let blob = c.encrypt("a-rather-long-address@example.com").unwrap();
        let preview = blob.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), 53);
        assert_eq!(EncryptedBlob::empty().preview(), "-");
    }

    #[test]
    fn debug_does_not_print_bytes() {
        let blob = EncryptedBlob::from(vec![0xAB; 40]);
        assert_eq!(format!("{blob:?}"), "EncryptedBlob(40 bytes)");
    }
}
