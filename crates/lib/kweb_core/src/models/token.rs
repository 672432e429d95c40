//! Token domain models.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Single-use authorization code captured from a provider callback.
///
/// Not `Clone`: the code moves into the token exchange and cannot be replayed.
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode(<redacted>)")
    }
}

/// Access/refresh token pair held by the session.
///
/// `expires_at` is an absolute UTC instant, so a record reloaded after a
/// restart expires at the same moment it would have in memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    /// Scopes granted, as reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenRecord {
    /// True when `now + skew` has reached `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now.checked_add_signed(skew)
            .is_none_or(|deadline| deadline >= self.expires_at)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Response body from the provider's token endpoint.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            access_token: "at-secret".into(),
            refresh_token: Some("refresh".into()),
            expires_at,
            token_type: "Bearer".into(),
            scope: None,
        }
    }

    #[test]
    fn is_expired_at_boundary_counts_as_expired() {
        let now = Utc::now();
        let skew = Duration::seconds(30);
        let r = record(now + skew);
        assert!(r.is_expired_at(now, skew));
        assert!(!r.is_expired_at(now - Duration::seconds(1), skew));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let r = record(Utc::now());
        let rendered = format!("{r:?}");
        assert!(!rendered.contains("at-secret"));
        assert!(rendered.contains("has_refresh_token: true"));

        let code = AuthorizationCode::new("ABC");
        assert_eq!(format!("{code:?}"), "AuthorizationCode(<redacted>)");
    }

    #[test]
    fn token_response_defaults_token_type() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":1800}"#).unwrap();
        assert_eq!(resp.token_type, "Bearer");
        assert!(resp.refresh_token.is_none());
    }

    #[test]
    fn record_serializes_absolute_expiry() {
        let expires_at = DateTime::parse_from_rfc3339("2026-10-16T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_value(record(expires_at)).unwrap();
        assert_eq!(json["expires_at"], "2026-10-16T12:00:00Z");
    }
}
