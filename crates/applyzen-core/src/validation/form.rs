//! Sign-in and sign-up form validation.
//!
//! Every failing field is reported, not just the first one, so a front end
//! can show all messages at once.

use std::collections::BTreeMap;
use std::fmt;

/// Minimum password length accepted by the sign-in and sign-up forms
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Field name → message, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, &'static str>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: &'static str) {
        self.errors.entry(field).or_insert(message);
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.errors.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.errors.iter().map(|(field, message)| (*field, *message))
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.values().copied().collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", "Name is required");
        }
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);

        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match");
        }

        errors.into_result()
    }
}

fn check_email(email: &str, errors: &mut ValidationErrors) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Invalid email");
    }
}

fn check_password(password: &str, errors: &mut ValidationErrors) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add("password", "Password must be at least 8 characters");
    }
}

/// Loose e-mail check: no whitespace, and an `@` with something on both sides
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    email
        .char_indices()
        .any(|(i, c)| c == '@' && i > 0 && i + 1 < email.len())
}
