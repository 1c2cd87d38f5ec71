//! Duplicate detection across already-encrypted records.
//!
//! Each candidate's email and mobile are decrypted, normalized and hashed, then
//! compared against the digests of the incoming values. Stored blobs are never
//! compared directly: every encryption uses a fresh nonce, so equal plaintexts
//! do not produce equal blobs.

use common::protocol::FieldError;
use thiserror::Error;
use tracing::warn;

use crate::crypto::{hash_for_comparison, Cipher, ComparisonDigest, DecryptionError, FieldKind};
use crate::store::CandidateRecord;

const EMAIL_TAKEN: &str = "This email is already registered.";
const MOBILE_TAKEN: &str = "This mobile number is already registered.";
const BOTH_TAKEN: &str = "A student with this email and mobile number is already registered.";

/// A registration rejected because the registrant already exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuplicateError {
    #[error("This email is already registered.")]
    Email,

    #[error("This mobile number is already registered.")]
    Mobile,

    /// The email and the mobile each match a different existing record.
    #[error("This email and this mobile number are already registered.")]
    EmailAndMobile,

    /// A single existing record matches both the email and the mobile.
    #[error("A student with this email and mobile number is already registered.")]
    SameRegistrant { record_id: i64 },
}

impl DuplicateError {
    /// Per-field messages for the form layer.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            DuplicateError::Email => vec![FieldError::new("email", EMAIL_TAKEN)],
            DuplicateError::Mobile => vec![FieldError::new("mobile", MOBILE_TAKEN)],
            DuplicateError::EmailAndMobile => vec![
                FieldError::new("email", EMAIL_TAKEN),
                FieldError::new("mobile", MOBILE_TAKEN),
            ],
            DuplicateError::SameRegistrant { .. } => vec![
                FieldError::new("email", BOTH_TAKEN),
                FieldError::new("mobile", BOTH_TAKEN),
            ],
        }
    }

    pub(crate) fn for_field(field: FieldKind) -> Self {
        match field {
            FieldKind::Email => DuplicateError::Email,
            FieldKind::Mobile => DuplicateError::Mobile,
        }
    }
}

/// Summary of an accepted scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Candidates that were decrypted and compared.
    pub scanned: usize,
    /// Candidates skipped because they could not be decrypted.
    pub skipped: usize,
}

/// Digests of the incoming values. Empty normalized values carry no digest
/// and never match anything.
struct Incoming {
    email: Option<ComparisonDigest>,
    mobile: Option<ComparisonDigest>,
}

impl Incoming {
    fn new(email: &str, mobile: &str) -> Self {
        Self {
            email: field_digest(FieldKind::Email, email),
            mobile: field_digest(FieldKind::Mobile, mobile),
        }
    }
}

fn field_digest(field: FieldKind, raw: &str) -> Option<ComparisonDigest> {
    let normalized = field.normalize(raw);
    (!normalized.is_empty()).then(|| hash_for_comparison(&normalized))
}

/// Linear decrypt-and-compare scan over candidate records.
pub struct DuplicateChecker<'a> {
    cipher: &'a Cipher,
}

impl<'a> DuplicateChecker<'a> {
    pub fn new(cipher: &'a Cipher) -> Self {
        Self { cipher }
    }

    /// Check an incoming (email, mobile) pair against every candidate.
    ///
    /// Records that fail to decrypt are logged and skipped rather than
    /// failing the check.
    ///
    /// # Errors
    ///
    /// Returns the most specific [`DuplicateError`] that applies:
    /// `SameRegistrant`, then `EmailAndMobile`, then `Email`, then `Mobile`.
    pub fn check<'r, I>(&self, email: &str, mobile: &str, candidates: I) -> Result<ScanReport, DuplicateError>
    where
        I: IntoIterator<Item = &'r CandidateRecord>,
    {
        let incoming = Incoming::new(email, mobile);
        let mut report = ScanReport::default();
        let mut email_hit = false;
        let mut mobile_hit = false;
        let mut same_record = None;

        for record in candidates {
            let (stored_email, stored_mobile) = match self.decrypt_record(record) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(
                        record_id = record.id,
                        error = %e,
                        "skipping undecryptable record during duplicate check"
                    );
                    report.skipped += 1;
                    continue;
                }
            };
            report.scanned += 1;

            let email_match = digests_equal(incoming.email, field_digest(FieldKind::Email, &stored_email));
            let mobile_match = digests_equal(incoming.mobile, field_digest(FieldKind::Mobile, &stored_mobile));

            if email_match && mobile_match && same_record.is_none() {
                same_record = Some(record.id);
            }
            email_hit |= email_match;
            mobile_hit |= mobile_match;
        }

        if report.skipped > 0 {
            warn!(
                scanned = report.scanned,
                skipped = report.skipped,
                "duplicate check ignored undecryptable records; they may be encrypted under a lost key"
            );
        }

        match (same_record, email_hit, mobile_hit) {
            (Some(record_id), _, _) => Err(DuplicateError::SameRegistrant { record_id }),
            (None, true, true) => Err(DuplicateError::EmailAndMobile),
            (None, true, false) => Err(DuplicateError::Email),
            (None, false, true) => Err(DuplicateError::Mobile),
            (None, false, false) => Ok(report),
        }
    }

    fn decrypt_record(
        &self,
        record: &CandidateRecord,
    ) -> Result<(String, String), DecryptionError> {
        Ok((
            self.cipher.decrypt(&record.email)?,
            self.cipher.decrypt(&record.mobile)?,
        ))
    }
}

fn digests_equal(incoming: Option<ComparisonDigest>, stored: Option<ComparisonDigest>) -> bool {
    matches!((incoming, stored), (Some(a), Some(b)) if a == b)
}
