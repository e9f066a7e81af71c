//! Session data keys.

/// Key under which the logged-in account's login key is stored in the session.
pub const SESSION_LOGIN_KEY: &str = "login_key";
