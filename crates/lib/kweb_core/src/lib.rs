//! # kweb_core
//!
//! Core domain logic for kweb: the OAuth2 authorization-code token manager.

pub mod config;
pub mod models;
pub mod oauth;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
