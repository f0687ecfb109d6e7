//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: shared, injectable session state (authenticated flag and
//!   refresh token)
//! - `TokenStore`: persistence for the refresh token, OS keychain backed via
//!   `KeyringTokenStore`
//! - `AuthService`: sign-in, sign-up and sign-out flows

pub mod credentials;
pub mod service;
pub mod session;

pub use credentials::{KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use service::AuthService;
pub use session::{SessionData, SessionStore};
