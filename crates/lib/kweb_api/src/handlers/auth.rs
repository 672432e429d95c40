//! Session status handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::models::AuthStatusResponse;

/// `GET /auth/status` — where the session is in the login lifecycle.
pub async fn auth_status_handler(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        state: state.session.state(),
    })
}

/// `POST /auth/logout` — drop the current token.
pub async fn logout_handler(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    state.session.logout().await;
    Json(AuthStatusResponse {
        state: state.session.state(),
    })
}
