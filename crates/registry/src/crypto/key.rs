//! Key provider: resolves the process-wide field encryption key.
//!
//! The key is resolved exactly once at startup and handed to
//! [`super::Cipher::new`]. Without a configured key an ephemeral one is
//! generated; anything encrypted under it is unreadable after a restart.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{
    engine::general_purpose::{GeneralPurpose, STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use thiserror::Error;
use tracing::warn;
use zeroize::{Zeroizing, ZeroizeOnDrop};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Accepted encodings for a configured key, tried in order.
const KEY_ENCODINGS: [&GeneralPurpose; 4] = [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD];

/// Errors produced while resolving the configured key.
///
/// These are configuration errors: the service refuses to start on any of them.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The configured value is not valid base64 in any accepted alphabet.
    #[error("ENCRYPTION_KEY is not valid base64")]
    NotBase64,

    /// The configured value decodes to the wrong number of bytes.
    #[error("ENCRYPTION_KEY must decode to {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// The buffer lives on the heap and is zeroized when this type is dropped.
pub struct KeyMaterial(Box<Zeroizing<[u8; KEY_LEN]>>);

impl KeyMaterial {
    /// Wrap raw key bytes. Used directly by tests that need a deterministic key.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(Zeroizing::new(bytes)))
    }

    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new(Zeroizing::new([0u8; KEY_LEN]));
        OsRng.fill_bytes(buf.as_mut_slice());
        Self(buf)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl ZeroizeOnDrop for KeyMaterial {}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Where the resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Read from `ENCRYPTION_KEY`.
    Configured,
    /// Generated for this process only.
    Ephemeral,
}

/// The outcome of key resolution.
#[derive(Debug)]
pub struct ResolvedKey {
    pub material: KeyMaterial,
    pub source: KeySource,
}

/// Resolve the field encryption key from its configured value.
///
/// A `None` or blank value yields an ephemeral key and an operator warning.
///
/// # Errors
///
/// Returns [`KeyError`] if a value is configured but is not base64 or does
/// not decode to exactly [`KEY_LEN`] bytes.
pub fn resolve(configured: Option<&str>) -> Result<ResolvedKey, KeyError> {
    let value = match configured.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => {
            warn!(
                "ENCRYPTION_KEY is not set; generated an ephemeral key. \
                 Records stored by this process will be unreadable after restart. \
                 Set ENCRYPTION_KEY to a base64-encoded {KEY_LEN}-byte key for any real deployment"
            );
            return Ok(ResolvedKey {
                material: KeyMaterial::generate(),
                source: KeySource::Ephemeral,
            });
        }
    };

    let decoded = KEY_ENCODINGS
        .iter()
        .find_map(|engine| engine.decode(value).ok())
        .ok_or(KeyError::NotBase64)?;

    let bytes: [u8; KEY_LEN] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength(decoded.len()))?;

    Ok(ResolvedKey {
        material: KeyMaterial::from_bytes(bytes),
        source: KeySource::Configured,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_is_ephemeral() {
        let resolved = resolve(None).unwrap();
        assert_eq!(resolved.source, KeySource::Ephemeral);

        let blank = resolve(Some("   ")).unwrap();
        assert_eq!(blank.source, KeySource::Ephemeral);
    }

    #[test]
    fn ephemeral_keys_differ_between_calls() {
        let a = resolve(None).unwrap();
        let b = resolve(None).unwrap();
        assert_ne!(a.material.as_bytes(), b.material.as_bytes());
    }

    #[test]
    fn key_buffer_is_zeroizing() {
        use zeroize::Zeroize;

        fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<KeyMaterial>();

        let mut key = KeyMaterial::from_bytes([0x42; KEY_LEN]);
        key.0.zeroize();
        assert!(key.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn configured_standard_base64() {
        let raw = [0x42u8; KEY_LEN];
        let resolved = resolve(Some(&STANDARD.encode(raw))).unwrap();
        assert_eq!(resolved.source, KeySource::Configured);
        assert_eq!(resolved.material.as_bytes(), &raw[..]);
    }

    #[test]
    fn configured_url_safe_base64() {
        // 0xfb / 0xff bytes force '-' and '_' in the URL-safe alphabet.
        let mut raw = [0xffu8; KEY_LEN];
        raw[0] = 0xfb;
        let resolved = resolve(Some(&URL_SAFE.encode(raw))).unwrap();
        assert_eq!(resolved.material.as_bytes(), &raw[..]);

        let resolved = resolve(Some(&URL_SAFE_NO_PAD.encode(raw))).unwrap();
        assert_eq!(resolved.material.as_bytes(), &raw[..]);
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(resolve(Some("not a key!")), Err(KeyError::NotBase64)));
    }

    #[test]
    fn rejects_wrong_length() {
        let short = STANDARD.encode([0u8; 16]);
        assert!(matches!(
            resolve(Some(&short)),
            Err(KeyError::InvalidLength(16))
        ));
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let key = KeyMaterial::from_bytes([0xAB; KEY_LEN]);
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("171"));
    }
}
