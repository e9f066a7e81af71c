//! # Credential store
//!
//! Accounts live in one JSON document (an array of [`UserAccount`]) in the same
//! content store as the student lists, and every change goes through the same
//! fetch / mutate / conditional-commit cycle. A missing document is an empty
//! list and is created by the first registration.
//!
//! ## Lifecycle
//!
//! Self-registration creates a `pending` user. An active admin moves accounts
//! between `pending`, `active` and `disabled`, changes roles and resets
//! passwords. Only `active` accounts can log in. Admin rights are checked
//! against the freshly fetched document inside the write, so a demotion that
//! lands first wins.
//!
//! The login key configured as `auth.bootstrap_admin` registers straight into
//! an active admin, which is how the first administrator comes to exist.
//!
//! Uniqueness of login keys is checked inside the mutation. Two simultaneous
//! registrations of the same key race like any other write: one commits, the
//! other gets [`CoreError::Conflict`].

use chrono::Utc;
use serde::Deserialize;
use store::{ContentStore, Repository, StoreError};

use crate::auth::{hash_password, validate_password, verify_password};
use crate::error::{from_update, CoreError};
use crate::models::{AccountInfo, Role, Status, UserAccount};
use crate::notify::{LogNotifier, Notifier};

/// Self-registration input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub login_key: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub unit: String,
}

/// Canonical form of a login key.
pub fn normalize_login_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub struct CredentialStore<S: ContentStore, N: Notifier = LogNotifier> {
    repo: Repository<S>,
    path: String,
    bootstrap_admin: Option<String>,
    notifier: N,
}

impl<S: ContentStore, N: Notifier> CredentialStore<S, N> {
    pub fn new(store: S, path: impl Into<String>, bootstrap_admin: &str, notifier: N) -> Self {
        let bootstrap_admin = normalize_login_key(bootstrap_admin);
        Self {
            repo: Repository::new(store),
            path: path.into(),
            bootstrap_admin: (!bootstrap_admin.is_empty()).then_some(bootstrap_admin),
            notifier,
        }
    }

    /// Add a new account. It starts `pending` unless it is the bootstrap admin.
    pub async fn register(&self, registration: &Registration) -> Result<AccountInfo, CoreError> {
        let login_key = normalize_login_key(&registration.login_key);
        if login_key.is_empty() {
            return Err(CoreError::Validation("login is required".to_string()));
        }
        let display_name = registration.display_name.trim();
        if display_name.is_empty() {
            return Err(CoreError::Validation("name is required".to_string()));
        }
        validate_password(&registration.password)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let password_hash = self.hash(&registration.password)?;

        let bootstrap = self.bootstrap_admin.as_deref() == Some(login_key.as_str());
        let account = UserAccount {
            login_key: login_key.clone(),
            password_hash,
            display_name: display_name.to_string(),
            role: if bootstrap { Role::Admin } else { Role::User },
            status: if bootstrap { Status::Active } else { Status::Pending },
            unit: registration.unit.trim().to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let info = account.to_info();

        let path = self.path.as_str();
        let message = format!("Novo usuário: {login_key}");
        self.repo
            .update_or_create(path, &message, |content| {
                let mut accounts = parse_accounts(path, content)?;
                if accounts.iter().any(|a| a.login_key == login_key) {
                    return Err(CoreError::Validation(format!(
                        "{login_key} is already registered"
                    )));
                }
                accounts.push(account);
                serialize_accounts(path, &accounts)
            })
            .await
            .map_err(|e| from_update(path, e))
            .inspect_err(|e| tracing::warn!("Registration of {} failed: {}", login_key, e))?;

        tracing::info!(
            "Registered {} as {} {}",
            login_key,
            info.status.as_str(),
            info.role.as_str()
        );
        if let Err(e) = self.notifier.account_registered(&info).await {
            tracing::warn!("Could not send registration notice for {}: {}", login_key, e);
        }
        Ok(info)
    }

    /// Check a login. Unknown keys and wrong passwords get the same answer;
    /// pending or disabled accounts are told so only after a correct password.
    pub async fn authenticate(
        &self,
        login_key: &str,
        password: &str,
    ) -> Result<AccountInfo, CoreError> {
        let invalid = || CoreError::Unauthorized("invalid login or password".to_string());
        let login_key = normalize_login_key(login_key);
        let accounts = self.load().await?;
        let account = accounts
            .iter()
            .find(|a| a.login_key == login_key)
            .ok_or_else(invalid)?;

        match verify_password(password, &account.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(invalid()),
            Err(e) => {
                tracing::error!("Stored hash for {} is unusable: {}", login_key, e);
                return Err(invalid());
            }
        }

        match account.status {
            Status::Active => Ok(account.to_info()),
            Status::Pending => Err(CoreError::Unauthorized(
                "account is awaiting approval".to_string(),
            )),
            Status::Disabled => Err(CoreError::Unauthorized("account is disabled".to_string())),
        }
    }

    pub async fn find(&self, login_key: &str) -> Result<Option<AccountInfo>, CoreError> {
        let login_key = normalize_login_key(login_key);
        Ok(self
            .load()
            .await?
            .iter()
            .find(|a| a.login_key == login_key)
            .map(UserAccount::to_info))
    }

    /// Every account, for an active admin.
    pub async fn list(&self, actor: &str) -> Result<Vec<AccountInfo>, CoreError> {
        let accounts = self.load().await?;
        require_admin(&accounts, &normalize_login_key(actor))?;
        Ok(accounts.iter().map(UserAccount::to_info).collect())
    }

    pub async fn set_status(
        &self,
        actor: &str,
        login_key: &str,
        status: Status,
    ) -> Result<AccountInfo, CoreError> {
        let message = format!("Status de {}: {}", normalize_login_key(login_key), status.as_str());
        self.admin_update(actor, login_key, &message, true, |account| {
            account.status = status;
        })
        .await
    }

    pub async fn set_role(
        &self,
        actor: &str,
        login_key: &str,
        role: Role,
    ) -> Result<AccountInfo, CoreError> {
        let message = format!("Perfil de {}: {}", normalize_login_key(login_key), role.as_str());
        self.admin_update(actor, login_key, &message, true, |account| {
            account.role = role;
        })
        .await
    }

    pub async fn reset_password(
        &self,
        actor: &str,
        login_key: &str,
        password: &str,
    ) -> Result<AccountInfo, CoreError> {
        validate_password(password).map_err(|e| CoreError::Validation(e.to_string()))?;
        let password_hash = self.hash(password)?;
        let message = format!("Senha redefinida: {}", normalize_login_key(login_key));
        self.admin_update(actor, login_key, &message, false, move |account| {
            account.password_hash = password_hash;
        })
        .await
    }

    /// Apply `change` to one account on behalf of an admin `actor`.
    /// `protect_self` refuses changes an admin makes to their own account.
    async fn admin_update<F>(
        &self,
        actor: &str,
        login_key: &str,
        message: &str,
        protect_self: bool,
        change: F,
    ) -> Result<AccountInfo, CoreError>
    where
        F: FnOnce(&mut UserAccount) + Send,
    {
        let actor = normalize_login_key(actor);
        let login_key = normalize_login_key(login_key);
        if protect_self && actor == login_key {
            return Err(CoreError::Unauthorized(
                "administrators cannot change their own role or status".to_string(),
            ));
        }

        let path = self.path.as_str();
        let mut updated = None;
        let result = self
            .repo
            .update(path, message, |content| {
                let mut accounts = parse_accounts(path, Some(content))?;
                require_admin(&accounts, &actor)?;
                let account = accounts
                    .iter_mut()
                    .find(|a| a.login_key == login_key)
                    .ok_or_else(|| CoreError::NotFound(format!("account {login_key}")))?;
                change(account);
                account.updated_at = Some(Utc::now());
                updated = Some(account.to_info());
                serialize_accounts(path, &accounts)
            })
            .await
            .map_err(|e| from_update(path, e));

        match result {
            Ok(_) => {
                tracing::info!("{} by {}", message, actor);
                updated.ok_or_else(|| CoreError::NotFound(format!("account {login_key}")))
            }
            Err(e) => {
                tracing::warn!("{} by {} refused: {}", message, actor, e);
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Vec<UserAccount>, CoreError> {
        match self.repo.fetch(&self.path).await {
            Ok(doc) => parse_accounts(&self.path, Some(&doc.content)),
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(CoreError::from_read(&self.path, e)),
        }
    }

    fn hash(&self, password: &str) -> Result<String, CoreError> {
        hash_password(password).map_err(|e| CoreError::Store {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

fn require_admin(accounts: &[UserAccount], actor: &str) -> Result<(), CoreError> {
    if accounts.iter().any(|a| a.login_key == actor && a.is_admin()) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized(
            "only an active administrator can do that".to_string(),
        ))
    }
}

fn parse_accounts(path: &str, content: Option<&[u8]>) -> Result<Vec<UserAccount>, CoreError> {
    match content {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
            serde_json::from_slice(bytes).map_err(|e| CoreError::Structural {
                path: path.to_string(),
                reason: e.to_string(),
            })
        }
        _ => Ok(Vec::new()),
    }
}

fn serialize_accounts(path: &str, accounts: &[UserAccount]) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec_pretty(accounts).map_err(|e| CoreError::Structural {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
