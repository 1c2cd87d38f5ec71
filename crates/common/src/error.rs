//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Duplicate`] → 409
/// - [`ServiceError::Validation`] → 422
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed (unparseable JSON, bad path parameter).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested student record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The registrant is already registered.
    #[error("duplicate registration: {0}")]
    Duplicate(String),

    /// One or more registration fields failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Encryption failed due to a crypto-layer error.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The backing store is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Duplicate(_) => 409,
            ServiceError::Validation(_) => 422,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Duplicate(_) => "duplicate",
            ServiceError::Validation(_) => "validation_failed",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// The caller-safe message carried by this error, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::NotFound(m)
            | ServiceError::Duplicate(m)
            | ServiceError::Validation(m)
            | ServiceError::EncryptionFailure(m)
            | ServiceError::Unavailable(m)
            | ServiceError::Internal(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ServiceError::Duplicate("x".into()).http_status(), 409);
        assert_eq!(ServiceError::Validation("x".into()).http_status(), 422);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Unavailable("x".into()).http_status(), 503);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::Duplicate("This email is already registered.".into());
        assert!(e.to_string().contains("already registered"));
        assert_eq!(e.message(), "This email is already registered.");
        assert_eq!(e.code(), "duplicate");
    }
}
