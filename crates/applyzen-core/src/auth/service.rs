use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::{LoginRequest, LogoutRequest, RegisterRequest};
use crate::validation::{LoginForm, RegisterForm};

use super::SessionStore;

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const LOGOUT_PATH: &str = "/logout";

/// Sign-in, sign-up and sign-out against the backend.
///
/// Forms are validated before anything is sent. Sign-in and sign-up bypass
/// the refresh interceptor: a 401 there means bad credentials, not an expired
/// session. Sign-out goes through it, so an expired access cookie is
/// refreshed before the backend is asked to drop the session.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Sign in with an e-mail address and password
    pub async fn login(&self, form: &LoginForm) -> Result<(), ApiError> {
        form.validate()?;

        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            username: form.email.trim().to_string(),
            password: form.password.clone(),
        })?;

        let response = self.api.send_once(&request).await.inspect_err(|e| {
            error!(error = %e, "Login failed");
        })?;
        let body = ApiClient::read_auth_response(response).await;

        if let Err(e) = self.session().establish(form.email.trim(), body.refresh_token) {
            warn!(error = %e, "Failed to persist session");
        }
        info!("Login successful");
        Ok(())
    }

    /// Create an account and sign in to it
    pub async fn register(&self, form: &RegisterForm) -> Result<(), ApiError> {
        form.validate()?;

        let request = ApiRequest::post(REGISTER_PATH).json(&RegisterRequest {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        })?;

        let response = self.api.send_once(&request).await.inspect_err(|e| {
            error!(error = %e, "Registration failed");
        })?;
        let body = ApiClient::read_auth_response(response).await;

        if body.refresh_token.is_none() {
            warn!("Registration response carried no refresh token");
        }
        if let Err(e) = self.session().establish(form.email.trim(), body.refresh_token) {
            warn!(error = %e, "Failed to persist session");
        }
        info!("Registration successful");
        Ok(())
    }

    /// Sign out.
    ///
    /// Without a stored refresh token this fails with `NoRefreshToken`
    /// before any network call and leaves the session untouched. If the
    /// backend rejects the call the session is also left as it was, unless
    /// the interceptor already tore it down (`SessionExpired`).
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.session().refresh_token().is_none() {
            return Err(ApiError::NoRefreshToken);
        }

        // Built per attempt: a refresh in between rotates the token
        let build = || {
            let refresh_token = self.session().refresh_token().ok_or(ApiError::NoRefreshToken)?;
            ApiRequest::post(LOGOUT_PATH).json(&LogoutRequest { refresh_token })
        };
        self.api.send_with(build).await.inspect_err(|e| {
            error!(error = %e, "Logout failed");
        })?;

        self.session().clear();
        info!("Logged out");
        Ok(())
    }
}
