pub mod config;
pub mod models;
pub mod objects;
pub mod repo;

mod file_store;
mod memory;
pub use file_store::FileStore;
pub use memory::MemoryStore;

pub use config::ThemeConfig;
pub use models::{CommitInfo, VersionToken, VersionedDocument};
pub use objects::Sha;
pub use repo::{ContentStore, Repository, StoreError, UpdateError};
