//! # Accounts
//!
//! [`UserAccount`] is one entry of the credential document, a JSON array kept
//! in the content store next to the student lists. It carries the Argon2 hash
//! and must never leave the server; [`AccountInfo`] is the projection handed to
//! callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Registered, waiting for an administrator.
    Pending,
    Active,
    Disabled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Active => "active",
            Status::Disabled => "disabled",
        }
    }
}

/// Stored account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Username or e-mail; trimmed, lower-cased and unique.
    pub login_key: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub status: Status,
    /// School unit the account belongs to.
    #[serde(default)]
    pub unit: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && self.is_active()
    }

    pub fn to_info(&self) -> AccountInfo {
        AccountInfo {
            login_key: self.login_key.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            status: self.status,
            unit: self.unit.clone(),
            created_at: self.created_at,
        }
    }
}

/// Account fields safe to return to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub login_key: String,
    pub display_name: String,
    pub role: Role,
    pub status: Status,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

impl AccountInfo {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && self.status == Status::Active
    }
}
