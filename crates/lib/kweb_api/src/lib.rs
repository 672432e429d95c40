//! # kweb_api
//!
//! HTTP API library for kweb.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use kweb_core::oauth::SessionCoordinator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, oauth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide OAuth session.
    pub session: Arc<SessionCoordinator>,
}

/// Builds the Axum router with all routes and shared state.
///
/// Cross-origin access is open for the login and status routes. `GET /token`
/// sits outside the CORS layer so a browser on another origin cannot read the
/// access token.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(routes::GET_ROOT, get(oauth::login_handler))
        .route(routes::GET_LOGIN, get(oauth::login_handler))
        .route(routes::GET_CALLBACK, get(oauth::callback_handler))
        .route(routes::GET_AUTH_STATUS, get(auth::auth_status_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .layer(cors)
        .route(routes::GET_TOKEN, get(oauth::token_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
