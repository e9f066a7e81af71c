//! # API crate: student lists and accounts for the school secretariat
//!
//! Domain logic behind the `secretaria` server. The student lists are two
//! `.docx` documents and the accounts one JSON document, all kept in a
//! [`store::ContentStore`] (normally a GitHub repository). Every write is a
//! fresh fetch, an in-memory change and a commit conditioned on the version
//! token just read.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`accounts`] | Registration, login and admin changes over the JSON credential document |
//! | [`auth`] | Argon2id password hashing, session keys |
//! | [`backend`] | The configured store: GitHub, a local directory or memory |
//! | [`docx`] | Reading tables out of `.docx` files and appending rows to them |
//! | [`error`] | [`CoreError`], the error every operation reports |
//! | [`github`] | GitHub contents API as a content store |
//! | [`models`] | Student records and accounts |
//! | [`notify`] | Best-effort notices on new registrations |
//! | [`records`] | Turning table rows into student records, name search |
//! | [`roster`] | Reading, searching and appending to the two student lists |
//! | [`settings`] | Layered configuration |
//! | [`theme`] | Branding document |

pub mod accounts;
pub mod auth;
pub mod backend;
mod cache;
pub mod docx;
pub mod error;
pub mod github;
pub mod models;
pub mod notify;
pub mod records;
pub mod roster;
pub mod settings;
pub mod theme;

pub use accounts::{CredentialStore, Registration};
pub use backend::Backend;
pub use error::CoreError;
pub use models::{AccountInfo, Category, NewStudent, Role, Status, StudentRecord};
pub use notify::{Notifier, Notifiers};
pub use roster::{CategoryLoad, Dashboard, DocumentPaths, Roster, SearchResult};
pub use settings::{Settings, SettingsError};
pub use theme::ThemeService;

pub use store::ThemeConfig;
