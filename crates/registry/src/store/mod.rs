//! Persistence for student records.
//!
//! # Invariants
//!
//! - Email and mobile are only ever stored as [`crate::crypto::EncryptedBlob`]s.
//! - Each record also stores the comparison digests of its email and mobile
//!   in `UNIQUE` columns, so two concurrent registrations for the same person
//!   cannot both commit.

pub mod students;

pub use students::{CandidateRecord, NewStudent, StoreError, StoredStudent, StudentFilter, StudentStore};
