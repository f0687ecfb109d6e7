//! REST API client module for the ApplyZen backend.
//!
//! This module provides the `ApiClient` for authenticated calls to the
//! backend. The backend keeps the short-lived access credential in a cookie
//! and hands out a longer-lived refresh token on sign-in; when the access
//! credential expires the client refreshes it once and replays the call.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ApiClient, REFRESH_PATH};
pub use error::ApiError;
pub use request::{ApiRequest, Attempt};
