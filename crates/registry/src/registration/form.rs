//! Registration form validation and cleaning.

use common::protocol::{FieldError, RegisterRequest};

use crate::crypto::FieldKind;

pub const NAME_MAX_CHARS: usize = 255;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const MOBILE_MAX_CHARS: usize = 20;
pub const CLASS_MAX_CHARS: usize = 100;
pub const MOBILE_MIN_DIGITS: usize = 10;

const REQUIRED: &str = "This field is required.";

/// A registration that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRegistration {
    pub name: String,
    /// Trimmed and lower-cased.
    pub email: String,
    /// Trimmed, otherwise as entered.
    pub mobile: String,
    pub student_class: Option<String>,
}

/// Validate every field of `req`, collecting all errors.
///
/// # Errors
///
/// Returns one [`FieldError`] per failed rule.
pub fn validate(req: &RegisterRequest) -> Result<CleanRegistration, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = req.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", REQUIRED));
    } else if let Some(e) = too_long("name", name, NAME_MAX_CHARS) {
        errors.push(e);
    }

    let email = FieldKind::Email.normalize(&req.email);
    if email.is_empty() {
        errors.push(FieldError::new("email", REQUIRED));
    } else if let Some(e) = too_long("email", &email, EMAIL_MAX_CHARS) {
        errors.push(e);
    } else if !is_plausible_email(&email) {
        errors.push(FieldError::new("email", "Enter a valid email address."));
    }

    let mobile = req.mobile.trim();
    if mobile.is_empty() {
        errors.push(FieldError::new("mobile", REQUIRED));
    } else if let Some(e) = too_long("mobile", mobile, MOBILE_MAX_CHARS) {
        errors.push(e);
    } else if FieldKind::Mobile.normalize(mobile).len() < MOBILE_MIN_DIGITS {
        errors.push(FieldError::new(
            "mobile",
            format!("Mobile number must contain at least {MOBILE_MIN_DIGITS} digits."),
        ));
    }

    let student_class = req
        .student_class
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if let Some(e) = student_class.and_then(|c| too_long("student_class", c, CLASS_MAX_CHARS)) {
        errors.push(e);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CleanRegistration {
        name: name.to_owned(),
        email,
        mobile: mobile.to_owned(),
        student_class: student_class.map(str::to_owned),
    })
}

fn too_long(field: &str, value: &str, max: usize) -> Option<FieldError> {
    let n = value.chars().count();
    (n > max).then(|| {
        FieldError::new(
            field,
            format!("Ensure this value has at most {max} characters (it has {n})."),
        )
    })
}

/// Structural email check: one `@`, a non-empty local part, and a dotted
/// domain with no empty labels. Deliverability is not checked.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, mobile: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            mobile: mobile.into(),
            student_class: Some("Grade 10".into()),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn valid_form_is_cleaned() {
        let clean = validate(&request(" John Doe ", " John@Example.COM", "1234567890")).unwrap();
        assert_eq!(clean.name, "John Doe");
        assert_eq!(clean.email, "john@example.com");
        assert_eq!(clean.mobile, "1234567890");
        assert_eq!(clean.student_class.as_deref(), Some("Grade 10"));
    }

    #[test]
    fn required_fields_are_enforced() {
        let errors = validate(&request("", "", "")).unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "email", "mobile"]);
        assert!(errors.iter().all(|e| e.message == REQUIRED));
    }

    #[test]
    fn invalid_email_rejected() {
        for bad in ["invalid-email", "a@b", "@b.com", "a@@b.com", "a b@c.com", "a@b..com"] {
            let errors = validate(&request("John", bad, "1234567890")).unwrap_err();
            assert_eq!(fields(&errors), vec!["email"], "accepted {bad:?}");
        }
    }

    #[test]
    fn short_mobile_rejected() {
        let errors = validate(&request("John", "john@example.com", "12345")).unwrap_err();
        assert_eq!(fields(&errors), vec!["mobile"]);
        assert!(errors[0].message.contains("at least 10 digits"));
    }

    #[test]
    fn formatted_mobile_accepted() {
        let clean = validate(&request("John", "john@example.com", "(987) 654-3210")).unwrap();
        assert_eq!(clean.mobile, "(987) 654-3210");
    }

    #[test]
    fn overlong_fields_rejected() {
        let long_name = "x".repeat(NAME_MAX_CHARS + 1);
        let errors = validate(&request(&long_name, "john@example.com", "1".repeat(21).as_str()))
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "mobile"]);
        assert!(errors[0].message.contains("at most 255 characters (it has 256)"));
    }

    #[test]
    fn blank_class_is_absent() {
        let mut req = request("John", "john@example.com", "1234567890");
        req.student_class = Some("   ".into());
        assert_eq!(validate(&req).unwrap().student_class, None);

        req.student_class = Some("c".repeat(CLASS_MAX_CHARS + 1));
        let errors = validate(&req).unwrap_err();
        assert_eq!(fields(&errors), vec!["student_class"]);
    }
}
