//! kweb API server binary.
//!
//! Loads `.env`, validates the OAuth configuration before binding anything,
//! restores a persisted token if one exists, and serves the login/callback
//! routes until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kweb_api::AppState;
use kweb_api::config::ApiConfig;
use kweb_core::config::OAuthConfig;
use kweb_core::oauth::{SessionCoordinator, TokenClient, TokenFile, TokenStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "kweb_api_server", about = "kweb OAuth proxy server")]
struct Args {
    /// Address to listen on; overrides `--port`.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// Port to listen on (on 127.0.0.1).
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Persist the token record to this JSON file across restarts.
    #[arg(long, env = "TOKEN_FILE")]
    token_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kweb_api=debug,kweb_core=debug")),
        )
        .init();

    let args = Args::parse();
    info!(version = kweb_core::version(), "starting kweb_api_server");

    let config = ApiConfig::new(args.bind_addr, args.port, args.token_file);

    // Missing OAuth values abort startup.
    let oauth = Arc::new(OAuthConfig::from_env()?);
    info!(
        auth_base_url = %oauth.auth_base_url,
        token_base_url = %oauth.token_base_url,
        redirect_uri = %oauth.redirect_uri,
        scopes = ?oauth.scopes,
        "OAuth configuration loaded"
    );

    let token_file = config.token_file.clone().map(TokenFile::new);
    let restored = match &token_file {
        Some(file) => match file.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %file.path().display(), error = %e, "ignoring unreadable token file");
                None
            }
        },
        None => None,
    };
    if restored.is_some() {
        info!("restored persisted token record");
    }

    let store = Arc::new(restored.map(TokenStore::with_record).unwrap_or_default());
    let client = TokenClient::new(&oauth)?;
    let mut session = SessionCoordinator::new(oauth, client, store);
    if let Some(file) = token_file {
        session = session.with_token_file(file);
    }

    let app = kweb_api::router(AppState {
        session: Arc::new(session),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
