//! Redirect callback parsing.

use url::Url;

use super::OAuthError;
use crate::models::AuthorizationCode;

/// Parameters captured from a successful provider callback.
#[derive(Debug)]
pub struct Callback {
    pub code: AuthorizationCode,
    /// CSRF state echoed back by the provider, if any.
    pub state: Option<String>,
}

/// Parse the callback URL's query component.
///
/// An OAuth2 error response (`?error=...`) takes precedence over any `code`
/// and is surfaced as [`OAuthError::Provider`].
pub fn parse_callback(callback_url: &str) -> Result<Callback, OAuthError> {
    let url =
        Url::parse(callback_url).map_err(|e| OAuthError::MalformedCallback(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;

    for (key, value) in url.query_pairs() {
        let slot = match &*key {
            "code" => &mut code,
            "state" => &mut state,
            "error" => &mut error,
            "error_description" => &mut description,
            _ => continue,
        };
        // First occurrence wins.
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    if let Some(error) = error {
        return Err(OAuthError::Provider { error, description });
    }

    let code = code
        .filter(|c| !c.is_empty())
        .ok_or(OAuthError::MissingCode)?;

    Ok(Callback {
        code: AuthorizationCode::new(code),
        state,
    })
}

/// Extract the authorization code bound to the `code` query key.
pub fn extract_code(callback_url: &str) -> Result<AuthorizationCode, OAuthError> {
    parse_callback(callback_url).map(|callback| callback.code)
}
