//! Authorization redirect URL construction.

use base64::Engine;
use rand::RngCore;
use urlencoding::encode;

use super::OAuthError;
use crate::config::{ConfigError, OAuthConfig};

/// Generate a cryptographic state parameter (CSRF token).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the provider `/authorize` URL the browser is redirected to.
///
/// Every query value is percent-encoded per RFC 3986, so a space in the scope
/// list becomes `%20`. Scopes are space-joined in first-occurrence order with
/// duplicates and blanks dropped, which keeps the output deterministic for a
/// given input.
pub fn build_authorization_url<S: AsRef<str>>(
    config: &OAuthConfig,
    scopes: &[S],
    state: &str,
) -> Result<String, OAuthError> {
    config.validate()?;

    let scope = join_scopes(scopes).ok_or(ConfigError::Missing("scopes"))?;
    if state.is_empty() {
        return Err(OAuthError::Internal("empty state parameter".into()));
    }

    Ok(format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        config.authorize_endpoint(),
        encode(&config.client_id),
        encode(&config.redirect_uri),
        encode(&scope),
        encode(state),
    ))
}

fn join_scopes<S: AsRef<str>>(scopes: &[S]) -> Option<String> {
    let mut seen: Vec<&str> = Vec::with_capacity(scopes.len());
    for scope in scopes.iter().map(|s| s.as_ref().trim()) {
        if !scope.is_empty() && !seen.contains(&scope) {
            seen.push(scope);
        }
    }
    (!seen.is_empty()).then(|| seen.join(" "))
}
