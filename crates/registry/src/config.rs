//! Configuration loading and validation for the registry service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is present but invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated registry service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64-encoded 32-byte field encryption key. When unset an ephemeral
    /// key is generated and stored data will not survive a restart.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// SQLite database file. An in-memory database is used when unset.
    #[serde(default)]
    pub database_path: Option<String>,

    /// Sender address on confirmation messages.
    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    /// OTLP endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8000
}
fn default_mail_from() -> String {
    "noreply@edtech.com".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("listen_port", &self.listen_port)
            .field("database_path", &self.database_path)
            .field("mail_from", &self.mail_from)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if !self.mail_from.contains('@') {
            anyhow::bail!("MAIL_FROM must be an email address");
        }
        if let Some(path) = &self.database_path {
            ensure_non_empty(path, "DATABASE_PATH")?;
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty when set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            encryption_key: Some("c2VjcmV0".into()),
            listen_port: default_listen_port(),
            database_path: Some("/var/lib/registry/students.db".into()),
            mail_from: default_mail_from(),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8000);
        assert_eq!(default_mail_from(), "noreply@edtech.com");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let cfg = Config {
            listen_port: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_database_path() {
        let cfg = Config {
            database_path: Some("  ".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_mail_from() {
        let cfg = Config {
            mail_from: "noreply".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let printed = format!("{:?}", valid());
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("c2VjcmV0"));
    }
}
