//! Decrypted display views of stored students for administration.
//!
//! A record that cannot be decrypted is still listed; its contact fields show
//! an inline error string instead.

use common::protocol::StudentView;

use crate::crypto::{Cipher, EncryptedBlob};
use crate::store::StoredStudent;

/// Shown for a field with no stored value.
pub const ABSENT: &str = "-";

/// Decrypt a blob for display. Never fails.
pub fn display_field(cipher: &Cipher, blob: &EncryptedBlob) -> String {
    if blob.is_empty() {
        return ABSENT.into();
    }
    match cipher.decrypt(blob) {
        Ok(plaintext) => plaintext,
        Err(e) => format!("Error: {e}"),
    }
}

pub fn view(cipher: &Cipher, student: &StoredStudent) -> StudentView {
    StudentView {
        id: student.id,
        name: student.name.clone(),
        email: display_field(cipher, &student.email),
        mobile: display_field(cipher, &student.mobile),
        student_class: student.student_class.clone(),
        encrypted_email_preview: student.email.preview(),
        encrypted_mobile_preview: student.mobile.preview(),
        created: student.created.clone(),
        modified: student.modified.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyMaterial;

    fn stored(cipher: &Cipher) -> StoredStudent {
        StoredStudent {
            id: 5,
            name: "Test Student".into(),
            email: cipher.encrypt("test@example.com").unwrap(),
            mobile: EncryptedBlob::empty(),
            student_class: None,
            created: "2026-01-01 00:00:00".into(),
            modified: "2026-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn view_decrypts_and_marks_absent() {
        let cipher = Cipher::new(&KeyMaterial::generate());
        let v = view(&cipher, &stored(&cipher));
        assert_eq!(v.email, "test@example.com");
        assert_eq!(v.mobile, ABSENT);
        assert_eq!(v.encrypted_mobile_preview, "-");
        assert!(!v.encrypted_email_preview.contains("test@example.com"));
    }

    #[test]
    fn wrong_key_shows_inline_error() {
        let writer = Cipher::new(&KeyMaterial::generate());
        let reader = Cipher::new(&KeyMaterial::generate());
        let v = view(&reader, &stored(&writer));
        assert!(v.email.starts_with("Error: authentication failed"));
        assert_eq!(v.name, "Test Student");
    }
}
