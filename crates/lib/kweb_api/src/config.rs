//! API server configuration.

use std::path::PathBuf;

/// Default listen port when neither `BIND_ADDR` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3001;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3001").
    pub bind_addr: String,
    /// Where the token record is persisted across restarts, if anywhere.
    pub token_file: Option<PathBuf>,
}

impl ApiConfig {
    /// Resolve the bind address from an explicit address or a port.
    pub fn new(bind_addr: Option<String>, port: Option<u16>, token_file: Option<PathBuf>) -> Self {
        let bind_addr = bind_addr
            .filter(|addr| !addr.trim().is_empty())
            .unwrap_or_else(|| format!("127.0.0.1:{}", port.unwrap_or(DEFAULT_PORT)));
        Self {
            bind_addr,
            token_file,
        }
    }
}
