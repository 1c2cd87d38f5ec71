//! Request and response types exchanged over the registry's JSON API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Request body for `POST /students`.
///
/// Email and mobile arrive in plaintext and are encrypted before they reach
/// the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    /// Optional class, e.g. `"Grade 10"`.
    #[serde(default)]
    pub student_class: Option<String>,
}

/// Successful response body for `POST /students`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Registration id assigned by the store.
    pub registration_id: i64,
    pub name: String,
    /// Cleaned (lower-cased) email the confirmation was addressed to.
    pub email: String,
    pub student_class: Option<String>,
    /// Whether the confirmation message was handed off successfully.
    pub notification_sent: bool,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Display view of one stored student, with contact fields decrypted.
///
/// `email` and `mobile` hold `"-"` when no value is stored and an
/// `"Error: ..."` string when the stored blob could not be decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub student_class: Option<String>,
    /// Base64 of the stored email blob, truncated for display.
    pub encrypted_email_preview: String,
    /// Base64 of the stored mobile blob, truncated for display.
    pub encrypted_mobile_preview: String,
    pub created: String,
    pub modified: String,
}

/// Query string for `GET /students`. Blank values are treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Exact class match.
    #[serde(default)]
    pub class: Option<String>,
    /// Case-insensitive substring match on name or class.
    #[serde(default)]
    pub q: Option<String>,
    /// Only records created on or after this date (`YYYY-MM-DD`).
    #[serde(default)]
    pub since: Option<String>,
}

/// Response body for `GET /students`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentList {
    pub total: usize,
    pub students: Vec<StudentView>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// A message attached to one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"duplicate"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Per-field messages for validation and duplicate failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Attach per-field messages.
    pub fn with_fields(mut self, fields: Vec<FieldError>) -> Self {
        self.fields = fields;
        self
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when running on an ephemeral encryption key.
    pub status: String,
    /// Whether the encryption key came from configuration.
    pub key_persistent: bool,
    /// Number of stored student records.
    pub students: usize,
}
