//! ERP API auth endpoint paths
//!
//! Paths are relative to the configured API base URL. The refresh endpoint
//! authenticates with the HTTP-only session cookie set by login, not with
//! the bearer token.

pub const LOGIN_PATH: &str = "/public/auth/login";

/// Second step of login when the account has two-factor auth enabled
pub const LOGIN_2FA_PATH: &str = "/public/auth/login/2fa";

pub const REFRESH_PATH: &str = "/public/auth/refresh-token";

pub const LOGOUT_PATH: &str = "/public/auth/logout";

/// Profile of the logged-in admin (protected)
pub const PROFILE_PATH: &str = "/admin/profile";
