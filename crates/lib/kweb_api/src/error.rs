//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kweb_core::oauth::OAuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Upstream(m) => (StatusCode::BAD_GATEWAY, "upstream_error", m.as_str()),
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<OAuthError> for AppError {
    fn from(e: OAuthError) -> Self {
        let message = e.to_string();
        match e {
            OAuthError::MalformedCallback(_)
            | OAuthError::MissingCode
            | OAuthError::Provider { .. }
            | OAuthError::StateMismatch
            | OAuthError::LoginExpired
            | OAuthError::NoPendingLogin => AppError::Validation(message),
            OAuthError::NoRefreshToken | OAuthError::NotAuthenticated => {
                AppError::Unauthorized(message)
            }
            OAuthError::TokenExchange { .. }
            | OAuthError::Network(_)
            | OAuthError::InvalidTokenResponse(_) => AppError::Upstream(message),
            OAuthError::Config(_) | OAuthError::Internal(_) => AppError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use kweb_core::config::ConfigError;

    use super::*;

    fn status_of(e: OAuthError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn callback_failures_are_bad_requests() {
        assert_eq!(status_of(OAuthError::MissingCode), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(OAuthError::StateMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(OAuthError::Provider {
                error: "access_denied".into(),
                description: None,
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_session_is_unauthorized() {
        assert_eq!(status_of(OAuthError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(OAuthError::NoRefreshToken), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn provider_failures_are_bad_gateway() {
        assert_eq!(
            status_of(OAuthError::TokenExchange {
                status: 400,
                body: "invalid_grant".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(OAuthError::Network("refused".into())), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(OAuthError::Config(ConfigError::Missing("client_secret")));
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
