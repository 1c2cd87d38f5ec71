//! Structured logging, with optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No PII or key material** may appear in any span attribute or log field.
//!   Records are identified by registration id only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
