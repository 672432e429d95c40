//! OAuth provider configuration.
//!
//! Loaded once at process start and shared read-only afterwards. Every
//! required value is checked up front so a misconfigured deployment fails at
//! startup instead of on the first login.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use url::Url;

/// Scopes requested when `OAUTH2_SCOPES` is not set.
pub const DEFAULT_SCOPES: &str = "product.compact cart.basic:write profile.compact";

/// Default timeout for token-endpoint requests (30 seconds).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_AUTH_BASE_URL: &str = "OAUTH2_BASE_URL";
pub const ENV_TOKEN_BASE_URL: &str = "OAUTH2_TOKEN_URL";
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const ENV_REDIRECT_URL: &str = "REDIRECT_URL";
pub const ENV_SCOPES: &str = "OAUTH2_SCOPES";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "OAUTH2_HTTP_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required config value: {0}")]
    Missing(&'static str),

    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// OAuth 2.0 provider configuration.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Base URL of the authorization server (`/authorize` is appended).
    pub auth_base_url: String,
    /// Base URL of the token endpoint (`/token` is appended).
    pub token_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Pre-registered redirect URI the provider sends the browser back to.
    pub redirect_uri: String,
    /// Static scope list requested on every login.
    pub scopes: Vec<String>,
    /// Timeout applied to token-endpoint requests.
    pub http_timeout: Duration,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("auth_base_url", &self.auth_base_url)
            .field("token_base_url", &self.token_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl OAuthConfig {
    /// Reads configuration from process environment variables.
    ///
    /// | Variable                   | Default                                  |
    /// |----------------------------|------------------------------------------|
    /// | `OAUTH2_BASE_URL`          | required                                 |
    /// | `OAUTH2_TOKEN_URL`         | value of `OAUTH2_BASE_URL`               |
    /// | `CLIENT_ID`                | required                                 |
    /// | `CLIENT_SECRET`            | required                                 |
    /// | `REDIRECT_URL`             | required                                 |
    /// | `OAUTH2_SCOPES`            | [`DEFAULT_SCOPES`]                       |
    /// | `OAUTH2_HTTP_TIMEOUT_SECS` | 30                                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| optional(key).ok_or(ConfigError::Missing(key));

        let auth_base_url = required(ENV_AUTH_BASE_URL)?;
        let token_base_url = match optional(ENV_TOKEN_BASE_URL) {
            Some(url) => url,
            None => {
                info!(
                    token_base_url = %auth_base_url,
                    "{ENV_TOKEN_BASE_URL} not set, using {ENV_AUTH_BASE_URL} for the token endpoint"
                );
                auth_base_url.clone()
            }
        };

        let http_timeout = match optional(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    field: ENV_HTTP_TIMEOUT_SECS,
                    reason: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let config = Self {
            auth_base_url,
            token_base_url,
            client_id: required(ENV_CLIENT_ID)?,
            client_secret: required(ENV_CLIENT_SECRET)?,
            redirect_uri: required(ENV_REDIRECT_URL)?,
            scopes: parse_scopes(&optional(ENV_SCOPES).unwrap_or_else(|| DEFAULT_SCOPES.into())),
            http_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every required field is present and every URL is absolute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("auth_base_url", &self.auth_base_url),
            ("token_base_url", &self.token_base_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }

        if self.scopes.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Missing("scopes"));
        }

        for (field, value) in [
            ("auth_base_url", &self.auth_base_url),
            ("token_base_url", &self.token_base_url),
            ("redirect_uri", &self.redirect_uri),
        ] {
            check_url(field, value)?;
        }

        if self.http_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "http_timeout",
                reason: "must be greater than zero".into(),
            });
        }

        Ok(())
    }

    /// Full URL of the provider's `/authorize` page.
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/authorize", self.auth_base_url.trim_end_matches('/'))
    }

    /// Full URL of the provider's `/token` endpoint.
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.token_base_url.trim_end_matches('/'))
    }
}

/// Split a whitespace- or comma-separated scope list.
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
impl OAuthConfig {
    /// Config pointing the token endpoint at `token_base_url` (a mock server).
    pub(crate) fn for_tests(token_base_url: &str) -> Self {
        Self {
            auth_base_url: "https://api.example.com/v1/connect/oauth2".into(),
            token_base_url: token_base_url.into(),
            client_id: "kweb-client".into(),
            client_secret: "s3cret".into(),
            redirect_uri: "http://localhost:3001/callback".into(),
            scopes: parse_scopes(DEFAULT_SCOPES),
            http_timeout: Duration::from_secs(5),
        }
    }
}
