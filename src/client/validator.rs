use lazy_static::lazy_static;
use regex::Regex;

use super::ClientInput;

lazy_static! {
    static ref LETTERS_AND_SPACES: Regex =
        Regex::new(r"^[A-Za-zÁÉÍÓÚÜÑáéíóúüñ ]+$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // 7-12 digits with an optional "-d" check digit, e.g. 12345678-1
    static ref NIT: Regex = Regex::new(r"^[0-9]{7,12}(-[0-9])?$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_name(field: &'static str, label: &str, value: &str, errors: &mut Vec<FieldError>) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError {
            field,
            message: format!("{label} is required"),
        });
        return;
    }
    let len = value.chars().count();
    if !(2..=50).contains(&len) {
        errors.push(FieldError {
            field,
            message: "must be between 2 and 50 characters".to_string(),
        });
    }
    if !LETTERS_AND_SPACES.is_match(value) {
        errors.push(FieldError {
            field,
            message: format!("{label} may only contain letters and spaces"),
        });
    }
}

/// Check a client against the registry rules. Returns every failure.
pub fn validate_client(input: &ClientInput) -> Vec<FieldError> {
    let mut errors = Vec::new();

    check_name("first_name", "First name", &input.first_name, &mut errors);
    check_name("last_name", "Last name", &input.last_name, &mut errors);

    if let Some(email) = input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        if email.chars().count() > 100 {
            errors.push(FieldError {
                field: "email",
                message: "must not exceed 100 characters".to_string(),
            });
        }
        if !EMAIL.is_match(email) {
            errors.push(FieldError {
                field: "email",
                message: "invalid e-mail format".to_string(),
            });
        }
    }

    if let Some(nit) = input.nit.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        if !NIT.is_match(nit) {
            errors.push(FieldError {
                field: "nit",
                message: "NIT must have 7-12 digits, optionally followed by -<digit>".to_string(),
            });
        }
    }

    errors
}
