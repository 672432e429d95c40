//! OAuth login, callback and token handlers.

use axum::Json;
use axum::extract::{OriginalUri, State};
use axum::http::Uri;
use axum::response::Redirect;
use kweb_core::oauth::SessionState;
use url::Url;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CallbackResponse, TokenResponse};

/// `GET /login` — redirect the browser to the provider's consent page.
pub async fn login_handler(State(state): State<AppState>) -> AppResult<Redirect> {
    let url = state.session.start_login()?;
    Ok(Redirect::to(&url))
}

/// `GET /callback` — complete the login with the provider's redirect.
pub async fn callback_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Json<CallbackResponse>> {
    let callback_url = callback_url(&state.session.config().redirect_uri, &uri)?;
    let record = state.session.handle_callback(&callback_url).await?;
    Ok(Json(CallbackResponse {
        status: SessionState::Authenticated,
        token_type: record.token_type,
        expires_at: record.expires_at,
    }))
}

/// `GET /token` — the current access token, refreshed if it has expired.
///
/// Hands out the bearer token of the whole session; only expose it to
/// trusted local callers. No CORS headers are sent for this route.
pub async fn token_handler(State(state): State<AppState>) -> AppResult<Json<TokenResponse>> {
    let record = state.session.ensure_valid_token().await?;
    Ok(Json(TokenResponse {
        access_token: record.access_token,
        token_type: record.token_type,
        expires_at: record.expires_at,
        scope: record.scope,
    }))
}

/// Rebuild the absolute callback URL from the configured redirect URI and
/// the query string the browser arrived with.
fn callback_url(redirect_uri: &str, uri: &Uri) -> AppResult<String> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| AppError::Internal(format!("invalid redirect URI: {e}")))?;
    url.set_query(uri.query());
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_keeps_query() {
        let uri: Uri = "/callback?code=ABC&state=xyz".parse().unwrap();
        let url = callback_url("http://localhost:3001/callback", &uri).unwrap();
        assert_eq!(url, "http://localhost:3001/callback?code=ABC&state=xyz");
    }

    #[test]
    fn callback_url_without_query() {
        let uri: Uri = "/callback".parse().unwrap();
        let url = callback_url("http://localhost:3001/callback", &uri).unwrap();
        assert_eq!(url, "http://localhost:3001/callback");
    }
}
