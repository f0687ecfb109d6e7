//! Client-side checks that run before anything is sent to the backend.
//!
//! - `form`: required fields, e-mail pattern, password length and confirmation
//! - `password`: password strength scoring for the sign-up meter

pub mod form;
pub mod password;

pub use form::{LoginForm, RegisterForm, ValidationErrors};
pub use password::{password_strength, PasswordStrength};
