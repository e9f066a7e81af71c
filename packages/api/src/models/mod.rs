//! Data models for the application.

mod student;
mod user;

pub use student::{Category, NewStudent, StudentRecord, DEFAULT_SEQUENCE};
pub use user::{AccountInfo, Role, Status, UserAccount};
