//! Shared helpers for integration tests against a wiremock backend.

// Not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;

use applyzen_core::{ApiClient, AuthService, Config, MemoryTokenStore, SessionStore};
use wiremock::MockServer;

pub const IDENTITY: &str = "ada@example.com";

pub struct Harness {
    pub api: ApiClient,
    pub session: SessionStore,
    pub tokens: Arc<MemoryTokenStore>,
}

impl Harness {
    /// Signed-out client pointed at `server`
    pub fn new(server: &MockServer) -> Self {
        let tokens = Arc::new(MemoryTokenStore::new());
        let session = SessionStore::new(tokens.clone());
        let config = Config {
            api_base_url: server.uri(),
            ..Config::default()
        };
        let api = ApiClient::new(&config, session.clone()).expect("client builds");
        Self { api, session, tokens }
    }

    /// Client whose session holds `refresh_token`
    pub fn signed_in(server: &MockServer, refresh_token: &str) -> Self {
        let harness = Self::new(server);
        harness
            .session
            .establish(IDENTITY, Some(refresh_token.to_string()))
            .expect("session established");
        harness
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.api.clone())
    }

    pub fn stored_token(&self) -> Option<String> {
        use applyzen_core::TokenStore;
        self.tokens.load().expect("memory store never fails")
    }
}

/// Number of requests the server saw for `path`
pub async fn hits(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}
