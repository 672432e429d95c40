//! Route paths.

pub const GET_ROOT: &str = "/";
pub const GET_LOGIN: &str = "/login";
pub const GET_CALLBACK: &str = "/callback";
pub const GET_TOKEN: &str = "/token";
pub const GET_AUTH_STATUS: &str = "/auth/status";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
