//! Comparison digests: deterministic SHA-256 of normalized plaintext.
//!
//! Digests are independent of the encryption key so duplicate detection keeps
//! working regardless of how the field key is managed.

use sha2::{Digest as _, Sha256};

/// Byte length of a [`ComparisonDigest`].
pub const DIGEST_LEN: usize = 32;

/// One-way digest of a normalized value, used only for equality tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonDigest([u8; DIGEST_LEN]);

impl ComparisonDigest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Hash an already-normalized value.
pub fn hash_for_comparison(normalized: &str) -> ComparisonDigest {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Sha256::digest(normalized.as_bytes()));
    ComparisonDigest(out)
}

/// The encrypted contact fields, each with its own normalization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Email,
    Mobile,
}

impl FieldKind {
    /// Form field name, as used in API error payloads.
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::Mobile => "mobile",
        }
    }

    /// Canonicalize a raw value: trimmed lower-case for email, digits only for mobile.
    pub fn normalize(self, raw: &str) -> String {
        match self {
            FieldKind::Email => raw.trim().to_lowercase(),
            FieldKind::Mobile => raw.chars().filter(char::is_ascii_digit).collect(),
        }
    }

    /// Normalize then hash.
    pub fn digest(self, raw: &str) -> ComparisonDigest {
        hash_for_comparison(&self.normalize(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn deterministic() {
        assert_eq!(hash_for_comparison("x"), hash_for_comparison("x"));
        assert_ne!(hash_for_comparison("x"), hash_for_comparison("y"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(FieldKind::Email.normalize("  A@B.com "), "a@b.com");
        assert_eq!(
            FieldKind::Email.digest("a@B.com "),
            FieldKind::Email.digest("a@b.com")
        );
        assert_eq!(
            FieldKind::Email.digest("TEST@EXAMPLE.COM"),
            FieldKind::Email.digest("test@example.com")
        );
        assert_ne!(
            FieldKind::Email.digest("test@example.com"),
            FieldKind::Email.digest("different@example.com")
        );
    }

    #[test]
    fn mobile_normalization() {
        assert_eq!(FieldKind::Mobile.normalize("+1 (987) 654-3210"), "19876543210");
        assert_eq!(
            FieldKind::Mobile.digest("(987) 654-3210"),
            FieldKind::Mobile.digest("9876543210")
        );
    }

    #[test]
    fn no_collisions_in_sample() {
        let digests: HashSet<ComparisonDigest> = (0..10_000)
            .map(|i| hash_for_comparison(&format!("student{i}@example.com")))
            .collect();
        assert_eq!(digests.len(), 10_000);
    }
}
