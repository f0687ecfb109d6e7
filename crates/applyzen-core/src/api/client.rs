//! API client for communicating with the ApplyZen backend.
//!
//! The access credential travels as a cookie kept in the client's cookie jar.
//! When a call comes back 401 the client refreshes the credential once, using
//! the refresh token held by the [`SessionStore`], and replays the call.

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::{AuthResponse, RefreshRequest};

use super::request::{ApiRequest, Attempt};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Endpoint that exchanges a refresh token for a new access credential
pub const REFRESH_PATH: &str = "/refresh";

/// API client for the ApplyZen backend.
/// Clone is cheap - reqwest::Client and SessionStore are both shared handles,
/// so clones share the connection pool, cookie jar and session.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Create a client for `config.api_base_url` bound to `session`
    pub fn new(config: &Config, session: SessionStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send an authenticated request.
    ///
    /// A 401 on the first attempt triggers exactly one credential refresh
    /// followed by exactly one resend. If the refresh fails the session is
    /// cleared and `ApiError::SessionExpired` carries the refresh error; the
    /// original 401 is dropped. Any other failure, including a 401 on the
    /// resend, is returned as is.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        self.send_with(|| Ok(request.clone())).await
    }

    /// Like [`send`](Self::send), but the request is built anew for every
    /// attempt, so a resend after a refresh sees the renewed session (for
    /// bodies that carry the refresh token).
    pub async fn send_with<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> Result<ApiRequest, ApiError>,
    {
        let mut attempt = Attempt::First;

        loop {
            let request = build()?;
            let response = self.dispatch(&request).await?;
            let status = response.status();

            if !is_failure(status) {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && attempt.may_refresh() {
                attempt = attempt.next();
                debug!(path = request.path(), "Access credential rejected, refreshing");

                if let Err(refresh_err) = self.refresh().await {
                    warn!(
                        path = request.path(),
                        error = %refresh_err,
                        "Credential refresh failed, clearing session"
                    );
                    self.session.clear();
                    return Err(ApiError::SessionExpired(Box::new(refresh_err)));
                }

                debug!(path = request.path(), "Credential refreshed, retrying request");
                continue;
            }

            return Err(Self::error_from(response).await);
        }
    }

    /// Send a request without the refresh interceptor
    pub async fn send_once(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let response = self.dispatch(request).await?;
        Self::check_response(response).await
    }

    /// Exchange the stored refresh token for a new access credential.
    ///
    /// Fails with `NoRefreshToken` before any network call when the session
    /// holds no token. A rotated refresh token is stored in the session.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let refresh_token = self.session.refresh_token().ok_or(ApiError::NoRefreshToken)?;

        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body = Self::read_auth_response(response).await;

        if let Err(e) = self.session.renew(body.refresh_token) {
            warn!(error = %e, "Failed to persist refreshed session");
        }
        info!("Access credential refreshed");
        Ok(())
    }

    /// GET `path` and parse the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(&ApiRequest::get(path)).await?;
        Self::read_json(response).await
    }

    /// POST `body` to `path` and parse the JSON response
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(&ApiRequest::post(path).json(body)?).await?;
        Self::read_json(response).await
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let url = self.url(request.path());
        debug!(method = %request.method(), url = %url, "Sending request");

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if is_failure(response.status()) {
            Err(Self::error_from(response).await)
        } else {
            Ok(response)
        }
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::from_status(status, &body)
    }

    /// Parse a JSON body, reporting the (truncated) body on failure
    pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{}: {}", e, ApiError::truncate_body(&text)))
        })
    }

    /// Read the body of a successful auth call (`/login`, `/register`,
    /// `/refresh`). The status already decided success, so a body that is
    /// empty, unreadable or not JSON only costs the rotated token.
    pub async fn read_auth_response(response: Response) -> AuthResponse {
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to read auth response body");
                return AuthResponse::default();
            }
        };
        parse_auth_body(&text)
    }
}

fn parse_auth_body(text: &str) -> AuthResponse {
    if text.trim().is_empty() {
        return AuthResponse::default();
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!(
            error = %e,
            body = %ApiError::truncate_body(text),
            "Auth response is not JSON, keeping current token"
        );
        AuthResponse::default()
    })
}

/// Anything at or above 400 is a failure
fn is_failure(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> ApiClient {
        let config = Config {
            api_base_url: base.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client_for("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/login"), "http://localhost:8000/login");
        assert_eq!(client.url("login"), "http://localhost:8000/login");
    }

    #[test]
    fn test_is_failure() {
        assert!(!is_failure(StatusCode::OK));
        assert!(!is_failure(StatusCode::NO_CONTENT));
        assert!(!is_failure(StatusCode::NOT_MODIFIED));
        assert!(is_failure(StatusCode::BAD_REQUEST));
        assert!(is_failure(StatusCode::UNAUTHORIZED));
        assert!(is_failure(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_parse_auth_body() {
        let body = parse_auth_body(r#"{"refresh_token": "rt-2", "message": "ok"}"#);
        assert_eq!(body.refresh_token.as_deref(), Some("rt-2"));

        assert!(parse_auth_body("").refresh_token.is_none());
        // Plain-text success bodies are tolerated
        let body = parse_auth_body("Token refreshed");
        assert!(body.refresh_token.is_none());
        assert!(body.message.is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_fast() {
        // Port 9 (discard) is never contacted; the missing token short-circuits
        let client = client_for("http://127.0.0.1:9");
        let err = client.refresh().await.unwrap_err();
        assert!(matches!(err, ApiError::NoRefreshToken));
    }
}
