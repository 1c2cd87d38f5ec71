//! Registration confirmation messages.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("confirmation could not be delivered: {0}")]
    Delivery(String),
}

/// A composed confirmation message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub registration_id: i64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Confirmation {
    pub fn compose(
        from: &str,
        registration_id: i64,
        name: &str,
        email: &str,
        student_class: Option<&str>,
    ) -> Self {
        let class_line = student_class
            .map(|c| format!("Class: {c}\n"))
            .unwrap_or_default();
        Self {
            registration_id,
            from: from.to_owned(),
            to: email.to_owned(),
            subject: format!("Registration Confirmation - ID: {registration_id}"),
            body: format!(
                "Dear {name},\n\n\
                 Your registration has been completed successfully.\n\n\
                 Registration ID: {registration_id}\n\
                 {class_line}\n\
                 Thank you!"
            ),
        }
    }
}

/// Delivery seam for confirmation messages.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn send(&self, confirmation: &Confirmation) -> Result<(), NotifyError>;
}

/// Records each confirmation as a tracing event instead of delivering it.
///
/// Only the registration id is logged; recipient and body stay out of logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        info!(
            registration_id = confirmation.registration_id,
            "registration confirmation dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_includes_id_and_name() {
        let c = Confirmation::compose(
            "noreply@edtech.com",
            42,
            "Test Student",
            "teststudent@example.com",
            Some("Grade 11"),
        );
        assert_eq!(c.subject, "Registration Confirmation - ID: 42");
        assert_eq!(c.to, "teststudent@example.com");
        assert!(c.body.starts_with("Dear Test Student,"));
        assert!(c.body.contains("Registration ID: 42"));
        assert!(c.body.contains("Class: Grade 11"));
    }

    #[test]
    fn compose_without_class() {
        let c = Confirmation::compose("noreply@edtech.com", 1, "A", "a@b.com", None);
        assert!(!c.body.contains("Class:"));
    }

    #[test]
    fn log_notifier_succeeds() {
        let c = Confirmation::compose("noreply@edtech.com", 1, "A", "a@b.com", None);
        assert!(LogNotifier.send(&c).is_ok());
    }
}
