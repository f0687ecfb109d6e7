use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::credentials::{MemoryTokenStore, TokenStore};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Client-side record of the current session.
///
/// `refresh_token` is `Some` only while `is_authenticated` is true. The token
/// is never written to the session file; it lives in the [`TokenStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub is_authenticated: bool,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    pub identity: Option<String>,
    pub authenticated_at: Option<DateTime<Utc>>,
}

/// Shared handle to the session.
///
/// Clone is cheap; every clone sees the same state. The store is handed to
/// the API client and to whatever front end needs the auth state. All
/// methods take `&self` and never block on I/O longer than a keychain call,
/// so `clear` can run from inside the HTTP layer.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<SessionData>>,
    tokens: Arc<dyn TokenStore>,
    session_file: Option<PathBuf>,
}

impl SessionStore {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionData::default())),
            tokens,
            session_file: None,
        }
    }

    /// Session with no persistence outside the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Also persist session metadata to `session.json` in `cache_dir`
    pub fn with_session_file(mut self, cache_dir: PathBuf) -> Self {
        self.session_file = Some(cache_dir.join(SESSION_FILE));
        self
    }

    /// Load the persisted session. Returns whether it is authenticated.
    ///
    /// A session file that claims to be authenticated without a stored
    /// refresh token is treated as signed out.
    pub fn restore(&self) -> Result<bool> {
        let mut data = match self.session_file {
            Some(ref path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .context("Failed to read session file")?;
                serde_json::from_str::<SessionData>(&contents)
                    .context("Failed to parse session file")?
            }
            _ => SessionData::default(),
        };

        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to load refresh token");
                None
            }
        };

        if data.is_authenticated && token.is_some() {
            data.refresh_token = token;
        } else {
            if data.is_authenticated {
                debug!("Session file present but no refresh token stored");
            }
            data = SessionData::default();
        }

        let authenticated = data.is_authenticated;
        *self.write() = data;
        debug!(authenticated, "Session restored");
        Ok(authenticated)
    }

    pub fn snapshot(&self) -> SessionData {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn identity(&self) -> Option<String> {
        self.read().identity.clone()
    }

    /// Set the authenticated flag. Signing out also drops the in-memory token.
    pub fn set_authenticated(&self, authenticated: bool) {
        {
            let mut state = self.write();
            state.is_authenticated = authenticated;
            if !authenticated {
                state.refresh_token = None;
            }
        }
        self.save_or_warn();
    }

    /// Replace the refresh token in memory and in the token store.
    ///
    /// Storing a token on a signed-out session is refused.
    pub fn set_refresh_credential(&self, token: Option<String>) -> Result<()> {
        {
            let mut state = self.write();
            if token.is_some() && !state.is_authenticated {
                anyhow::bail!("Cannot store a refresh token on a signed-out session");
            }
            state.refresh_token = token.clone();
        }
        self.persist_token(token.as_deref())
    }

    /// Mark the session authenticated for `identity`, storing `token` if one
    /// was issued. Without a new token the current one is kept only for the
    /// same identity. The in-memory state is updated even if persisting fails.
    pub fn establish(&self, identity: &str, token: Option<String>) -> Result<()> {
        let identity_changed = {
            let mut state = self.write();
            let identity_changed = state.identity.as_deref() != Some(identity);
            state.is_authenticated = true;
            state.identity = Some(identity.to_string());
            state.authenticated_at = Some(Utc::now());
            if token.is_some() || identity_changed {
                state.refresh_token = token.clone();
            }
            identity_changed
        };
        info!(identity, "Session established");

        self.save()?;
        match token {
            Some(ref t) => self.persist_token(Some(t)),
            None if identity_changed => self.persist_token(None),
            None => Ok(()),
        }
    }

    /// Record a successful credential refresh, replacing the token if the
    /// backend rotated it
    pub fn renew(&self, token: Option<String>) -> Result<()> {
        {
            let mut state = self.write();
            state.is_authenticated = true;
            state.authenticated_at = Some(Utc::now());
            if token.is_some() {
                state.refresh_token = token.clone();
            }
        }
        debug!(rotated = token.is_some(), "Session renewed");

        self.save()?;
        match token {
            Some(ref t) => self.persist_token(Some(t)),
            None => Ok(()),
        }
    }

    /// Reset to signed out and forget the persisted token and session file.
    /// Idempotent; persistence failures are logged.
    pub fn clear(&self) {
        *self.write() = SessionData::default();

        if let Err(e) = self.tokens.remove() {
            warn!(error = %e, "Failed to remove refresh token");
        }
        if let Some(ref path) = self.session_file {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(error = %e, path = %path.display(), "Failed to remove session file");
                }
            }
        }
        info!("Session cleared");
    }

    fn persist_token(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(t) => self.tokens.save(t),
            None => self.tokens.remove(),
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(ref path) = self.session_file {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(&*self.read())?;
            std::fs::write(path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save session");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &state.is_authenticated)
            .field("has_refresh_token", &state.refresh_token.is_some())
            .field("identity", &state.identity)
            .finish()
    }
}
