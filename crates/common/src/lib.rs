//! Common types, protocol definitions, and errors shared across `student-registry` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
