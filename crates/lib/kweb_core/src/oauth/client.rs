//! Token endpoint client: code exchange and token refresh.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::CACHE_CONTROL;
use tracing::{debug, warn};

use super::OAuthError;
use crate::config::OAuthConfig;
use crate::models::{AuthorizationCode, TokenRecord, TokenResponse};

/// HTTP client for the provider's `/token` endpoint.
///
/// Holds no token state; every call works only on what is passed in.
#[derive(Clone)]
pub struct TokenClient {
    http: reqwest::Client,
}

impl TokenClient {
    /// Build a client using the configured request timeout.
    pub fn new(config: &OAuthConfig) -> Result<Self, OAuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| OAuthError::Internal(format!("HTTP client init failed: {e}")))?;
        Ok(Self { http })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// The code is consumed by this call whatever the outcome. A failed
    /// exchange needs a fresh login, never a retry with the same code.
    pub async fn exchange_code(
        &self,
        config: &OAuthConfig,
        code: AuthorizationCode,
    ) -> Result<TokenRecord, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];
        self.request_token(config, &params).await
    }

    /// Obtain a new token pair using the record's refresh token.
    ///
    /// Providers that do not rotate refresh tokens omit one from the response;
    /// the previous refresh token is kept in that case.
    pub async fn refresh(
        &self,
        config: &OAuthConfig,
        record: &TokenRecord,
    ) -> Result<TokenRecord, OAuthError> {
        let refresh_token = record
            .refresh_token
            .as_deref()
            .ok_or(OAuthError::NoRefreshToken)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let mut refreshed = self.request_token(config, &params).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = record.refresh_token.clone();
        }
        Ok(refreshed)
    }

    async fn request_token(
        &self,
        config: &OAuthConfig,
        params: &[(&str, &str)],
    ) -> Result<TokenRecord, OAuthError> {
        let endpoint = config.token_endpoint();
        let grant_type = params
            .iter()
            .find_map(|(k, v)| (*k == "grant_type").then_some(*v))
            .unwrap_or_default();
        debug!(endpoint = %endpoint, grant_type, "requesting token");

        let issued_at = Utc::now();
        let resp = self
            .http
            .post(&endpoint)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .header(CACHE_CONTROL, "no-cache")
            .form(params)
            .send()
            .await
            .map_err(|e| OAuthError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| OAuthError::Network(format!("reading token response: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), grant_type, "token endpoint rejected request");
            return Err(OAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuthError::InvalidTokenResponse(e.to_string()))?;
        token_record(parsed, issued_at)
    }
}

/// Convert a token response into a record expiring `expires_in` seconds
/// after `issued_at`.
pub fn token_record(
    resp: TokenResponse,
    issued_at: DateTime<Utc>,
) -> Result<TokenRecord, OAuthError> {
    if resp.access_token.is_empty() {
        return Err(OAuthError::InvalidTokenResponse(
            "empty access_token".into(),
        ));
    }
    if resp.expires_in < 0 {
        return Err(OAuthError::InvalidTokenResponse(format!(
            "negative expires_in: {}",
            resp.expires_in
        )));
    }

    let expires_at = Duration::try_seconds(resp.expires_in)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or_else(|| {
            OAuthError::InvalidTokenResponse(format!("expires_in out of range: {}", resp.expires_in))
        })?;

    Ok(TokenRecord {
        access_token: resp.access_token,
        refresh_token: resp.refresh_token.filter(|t| !t.is_empty()),
        expires_at,
        token_type: resp.token_type,
        scope: resp.scope,
    })
}
