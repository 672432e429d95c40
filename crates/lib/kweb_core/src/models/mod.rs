//! Domain models.

pub mod token;

pub use token::{AuthorizationCode, TokenRecord, TokenResponse};
