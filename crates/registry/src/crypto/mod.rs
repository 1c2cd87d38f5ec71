//! Field-level encryption primitives and comparison digests.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//!
//! # Blob format
//!
//! ```text
//! 0x01 ‖ nonce (12 bytes) ‖ AES-256-GCM-SIV ciphertext + tag
//! ```
//!
//! The leading version byte enables future algorithm or key-version migration
//! without breaking stored records. The empty byte string means "no value".

pub mod cipher;
pub mod digest;
pub mod key;

pub use cipher::{Cipher, CipherError, DecryptionError, EncryptedBlob};
pub use digest::{hash_for_comparison, ComparisonDigest, FieldKind};
pub use key::{KeyMaterial, KeySource};
