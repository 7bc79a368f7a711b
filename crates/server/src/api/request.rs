//! Request body shared by the release endpoints, and status-code replies.

use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use seedwarden_core::ClientIdentity;

// ============================================================================
// Request
// ============================================================================

/// JSON body posted by autobrr-style callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub hash: Option<String>,
    /// Ignore the snapshot freshness window. Accepts `0`/`1` or a boolean.
    #[serde(default, deserialize_with = "flexible_flag")]
    pub cache_bypass: bool,
    /// Encoded `.torrent` bytes.
    #[serde(default)]
    pub torrent: Value,
}

impl ReleaseRequest {
    /// Parse a raw body; `None` when it is not a JSON object of this shape.
    pub fn parse(body: &Bytes) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity::new(&self.host, &self.user, &self.password)
    }

    /// Hash supplied by the caller, when non-empty.
    pub fn known_hash(&self) -> Option<String> {
        self.hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_lowercase)
    }
}

fn flexible_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "yes"),
        _ => false,
    })
}

// ============================================================================
// Response
// ============================================================================

/// A JSON body paired with a numeric status code outside the usual range.
#[derive(Debug)]
pub struct Reply<T> {
    pub code: u16,
    pub body: T,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl Reply<MessageResponse> {
    pub fn message(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            body: MessageResponse {
                message: message.into(),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        (status, Json(self.body)).into_response()
    }
}
