//! OAuth2 authorization-code flow.
//!
//! Builds the provider redirect, captures the callback code, exchanges and
//! refreshes tokens, and coordinates the single process-wide session.

pub mod authorize;
pub mod callback;
pub mod client;
pub mod persist;
pub mod session;
pub mod store;

use thiserror::Error;

use crate::config::ConfigError;

pub use authorize::{build_authorization_url, generate_state};
pub use callback::{Callback, extract_code, parse_callback};
pub use client::TokenClient;
pub use persist::{PersistError, TokenFile};
pub use session::{SessionCoordinator, SessionState};
pub use store::TokenStore;

/// OAuth flow errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed callback URL: {0}")]
    MalformedCallback(String),

    #[error("Callback is missing the authorization code")]
    MissingCode,

    #[error("Provider returned error '{error}': {}", .description.as_deref().unwrap_or("no description"))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("Callback state does not match the pending login")]
    StateMismatch,

    #[error("Pending login expired, start a new login")]
    LoginExpired,

    #[error("No login in progress")]
    NoPendingLogin,

    #[error("Token endpoint returned HTTP {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Token endpoint unreachable: {0}")]
    Network(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("No refresh token available, login required")]
    NoRefreshToken,

    #[error("Not authenticated, login required")]
    NotAuthenticated,

    #[error("Internal error: {0}")]
    Internal(String),
}
