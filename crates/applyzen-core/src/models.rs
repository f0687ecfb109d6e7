//! Request and response bodies exchanged with the ApplyZen backend.
//!
//! With the `ts` feature enabled these types also derive `ts_rs::TS` so the
//! web frontend can share them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `/refresh`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body of `/logout`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Response of `/login`, `/register` and `/refresh`.
/// The backend may add fields; anything unknown is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthResponse {
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a resume upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProcessedResume {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub processed_at: DateTime<Utc>,
    /// Where the processed document was saved
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub output_path: PathBuf,
    /// True when the processing service was unreachable and the result was
    /// produced locally.
    pub simulated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_ignores_unknown_fields() {
        let json = r#"{"refresh_token": "rt-1", "user": {"id": 7}, "expires_in": 900}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.refresh_token.as_deref(), Some("rt-1"));
        assert!(resp.message.is_none());
    }

    #[test]
    fn test_auth_response_without_token() {
        let resp: AuthResponse = serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
        assert_eq!(resp.refresh_token, None);
        assert_eq!(resp.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_refresh_request_wire_shape() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "refresh_token": "abc" }));
    }
}
