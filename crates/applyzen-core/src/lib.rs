//! Core library for ApplyZen - session, authenticated API client, auth flows
//! and resume upload.
//!
//! A front end builds one [`SessionStore`], hands it to an [`ApiClient`], and
//! talks to the backend through the client and [`AuthService`]. When a call
//! fails with [`ApiError::SessionExpired`] the session has already been
//! cleared and the front end should send the user back to sign-in.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod resume;
pub mod validation;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use auth::{AuthService, KeyringTokenStore, MemoryTokenStore, SessionData, SessionStore, TokenStore};
pub use config::Config;
pub use resume::{ResumeError, ResumeKind, ResumeProcessor};
pub use validation::{password_strength, LoginForm, PasswordStrength, RegisterForm, ValidationErrors};
