//! Request and response bodies.

use chrono::{DateTime, Utc};
use kweb_core::oauth::SessionState;
use serde::Serialize;

/// Error body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `GET /callback` success body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub status: SessionState,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// `GET /token` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// `GET /auth/status` and `POST /auth/logout` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub state: SessionState,
}
