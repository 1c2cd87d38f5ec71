//! Student registration: validation, duplicate detection, encryption, storage,
//! and confirmation.
//!
//! # Flow
//!
//! 1. [`form::validate`] cleans the request and collects field errors.
//! 2. The store lock is taken; [`DuplicateChecker`] scans every stored record.
//! 3. Email and mobile are encrypted and their comparison digests computed.
//! 4. The record is inserted while the lock is still held, then released.
//! 5. A [`Confirmation`] is handed to the [`Notifier`]. Delivery failure is
//!    logged and reported, but does not undo the registration.

pub mod duplicate;
pub mod form;
pub mod notify;

pub use duplicate::{DuplicateChecker, DuplicateError};
pub use notify::{Confirmation, LogNotifier, Notifier};

use std::sync::Arc;

use common::protocol::{FieldError, RegisterRequest};
use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::{Cipher, CipherError, FieldKind};
use crate::store::{NewStudent, StoreError, StudentStore};

/// Errors produced by [`Registrar::register`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration form is invalid")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error("failed to encrypt contact details: {0}")]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RegistrationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DigestConflict(field) => {
                RegistrationError::Duplicate(DuplicateError::for_field(field))
            }
            other => RegistrationError::Store(other),
        }
    }
}

/// A completed registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub student_class: Option<String>,
    pub notification_sent: bool,
}

/// Runs the registration flow against a store.
pub struct Registrar {
    cipher: Arc<Cipher>,
    store: StudentStore,
    notifier: Arc<dyn Notifier>,
    mail_from: String,
}

impl Registrar {
    pub fn new(
        cipher: Arc<Cipher>,
        store: StudentStore,
        notifier: Arc<dyn Notifier>,
        mail_from: String,
    ) -> Self {
        Self {
            cipher,
            store,
            notifier,
            mail_from,
        }
    }

    /// Register one student.
    ///
    /// Blocking: runs SQLite queries and decrypts every stored record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Invalid`] with every field error,
    /// [`RegistrationError::Duplicate`] if the registrant already exists, or a
    /// cipher/store error.
    pub fn register(&self, req: &RegisterRequest) -> Result<Registered, RegistrationError> {
        let clean = form::validate(req).map_err(RegistrationError::Invalid)?;

        let id = {
            let guard = self.store.lock()?;
            let candidates = guard.candidates()?;
            let report = DuplicateChecker::new(&self.cipher).check(
                &clean.email,
                &clean.mobile,
                &candidates,
            )?;

            let record = NewStudent {
                name: clean.name.clone(),
                email: self.cipher.encrypt(&clean.email)?,
                mobile: self.cipher.encrypt(&clean.mobile)?,
                email_digest: Some(FieldKind::Email.digest(&clean.email)),
                mobile_digest: Some(FieldKind::Mobile.digest(&clean.mobile)),
                student_class: clean.student_class.clone(),
            };
            let id = guard.insert(&record)?;
            info!(
                registration_id = id,
                scanned = report.scanned,
                skipped = report.skipped,
                "student registered"
            );
            id
        };

        let confirmation = Confirmation::compose(
            &self.mail_from,
            id,
            &clean.name,
            &clean.email,
            clean.student_class.as_deref(),
        );
        let notification_sent = match self.notifier.send(&confirmation) {
            Ok(()) => true,
            Err(e) => {
                warn!(registration_id = id, error = %e, "confirmation not sent; registration kept");
                false
            }
        };

        Ok(Registered {
            id,
            name: clean.name,
            email: clean.email,
            student_class: clean.student_class,
            notification_sent,
        })
    }
}
