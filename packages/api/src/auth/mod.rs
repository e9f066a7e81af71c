//! Password hashing and session keys for local accounts.

mod password;
mod session;

pub use password::{hash_password, validate_password, verify_password, PasswordError, MIN_PASSWORD_CHARS};
pub use session::SESSION_LOGIN_KEY;
