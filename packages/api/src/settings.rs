//! # Application settings
//!
//! Layered with the `config` crate, lowest priority first:
//!
//! 1. built-in defaults (below),
//! 2. `secretaria.toml` in the working directory (optional),
//! 3. environment variables `SECRETARIA__<SECTION>__<KEY>`
//!    (e.g. `SECRETARIA__STORE__OWNER=escola`),
//! 4. `GITHUB_TOKEN`, if set, for `store.token`.
//!
//! ```toml
//! [store]
//! backend = "github"          # github | local | memory
//! owner = "escola"
//! repository = "sistema-escolar"
//! branch = "main"
//! timeout_secs = 30
//!
//! [documents]
//! passivos = "EMEF PA-RESSACA.docx"
//! concluintes = "CONCLUINTES- PA-RESSACA.docx"
//! users = "usuarios.json"
//! theme = "config.json"
//!
//! [cache]
//! ttl_secs = 30
//!
//! [auth]
//! bootstrap_admin = "secretaria@escola.org"
//!
//! [notify]
//! webhook_url = ""            # empty: registrations are only logged
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! secure_cookies = false
//! ```
//!
//! The target repository is never guessed: [`Settings::validate`] refuses to
//! start when the GitHub backend has no owner, repository or token.

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const CONFIG_FILE: &str = "secretaria.toml";
const ENV_PREFIX: &str = "SECRETARIA";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where documents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Github,
    Local,
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct StoreSettings {
    pub backend: BackendKind,
    pub api_url: String,
    pub owner: String,
    pub repository: String,
    pub branch: String,
    pub token: String,
    pub local_root: String,
    /// HTTP timeout for the remote store. 0 disables the timeout.
    pub timeout_secs: u64,
}

impl StoreSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl std::fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSettings")
            .field("backend", &self.backend)
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("local_root", &self.local_root)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Paths of the documents inside the store.
#[derive(Debug, Clone, Deserialize)]
pub struct Documents {
    pub passivos: String,
    pub concluintes: String,
    pub users: String,
    pub theme: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
    /// Lifetime of cached reads in seconds. 0 disables the cache.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    /// Login key that registers straight into an active admin account.
    /// Empty disables bootstrapping.
    pub bootstrap_admin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Notify {
    /// Receives a JSON `POST` for every registration. Empty logs instead.
    pub webhook_url: String,
    pub timeout_secs: u64,
}

impl Notify {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: String,
    /// Mark the session cookie `Secure`; enable behind HTTPS.
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub store: StoreSettings,
    pub documents: Documents,
    pub cache: Cache,
    pub auth: Auth,
    pub notify: Notify,
    pub server: Server,
}

impl Settings {
    /// Load from defaults, `secretaria.toml` and the environment, then validate.
    pub fn new() -> Result<Self, SettingsError> {
        let builder = defaults()?
            .add_source(
                File::with_name(CONFIG_FILE)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("store.token", std::env::var("GITHUB_TOKEN").ok())?;
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from defaults plus a TOML string, ignoring the environment.
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        let settings: Settings = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fail fast on anything that would otherwise be guessed at runtime.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: &str| Err(SettingsError::Invalid(msg.to_string()));

        match self.store.backend {
            BackendKind::Github => {
                if self.store.owner.trim().is_empty() || self.store.repository.trim().is_empty() {
                    return invalid("store.owner and store.repository are required for the github backend");
                }
                if self.store.token.trim().is_empty() {
                    return invalid("store.token (or GITHUB_TOKEN) is required for the github backend");
                }
                if self.store.branch.trim().is_empty() {
                    return invalid("store.branch must not be empty");
                }
            }
            BackendKind::Local => {
                if self.store.local_root.trim().is_empty() {
                    return invalid("store.local_root is required for the local backend");
                }
            }
            BackendKind::Memory => {}
        }

        let docs = &self.documents;
        for (name, path) in [
            ("documents.passivos", &docs.passivos),
            ("documents.concluintes", &docs.concluintes),
            ("documents.users", &docs.users),
            ("documents.theme", &docs.theme),
        ] {
            if path.trim().is_empty() {
                return Err(SettingsError::Invalid(format!("{name} must not be empty")));
            }
        }
        if docs.passivos == docs.concluintes {
            return invalid("documents.passivos and documents.concluintes must differ");
        }
        if self.server.bind.trim().is_empty() {
            return invalid("server.bind must not be empty");
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("store.backend", "github")?
        .set_default("store.api_url", "https://api.github.com")?
        .set_default("store.owner", "")?
        .set_default("store.repository", "")?
        .set_default("store.branch", "main")?
        .set_default("store.token", "")?
        .set_default("store.local_root", "./data")?
        .set_default("store.timeout_secs", 30_i64)?
        .set_default("documents.passivos", "EMEF PA-RESSACA.docx")?
        .set_default("documents.concluintes", "CONCLUINTES- PA-RESSACA.docx")?
        .set_default("documents.users", "usuarios.json")?
        .set_default("documents.theme", store::ThemeConfig::filename())?
        .set_default("cache.ttl_secs", 30_i64)?
        .set_default("auth.bootstrap_admin", "")?
        .set_default("notify.webhook_url", "")?
        .set_default("notify.timeout_secs", 10_i64)?
        .set_default("server.bind", "127.0.0.1:8080")?
        .set_default("server.secure_cookies", false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_backend_requires_explicit_target() {
        let err = Settings::from_toml("").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));

        let err = Settings::from_toml(
            r#"
            [store]
            owner = "escola"
            repository = "sistema-escolar"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_settings_defaults_and_overrides() {
        let settings = Settings::from_toml(
            r#"
            [store]
            owner = "escola"
            repository = "sistema-escolar"
            token = "ghp_secret"
            timeout_secs = 5

            [cache]
            ttl_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(settings.store.backend, BackendKind::Github);
        assert_eq!(settings.store.branch, "main");
        assert_eq!(settings.store.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(settings.documents.passivos, "EMEF PA-RESSACA.docx");
        assert_eq!(settings.documents.concluintes, "CONCLUINTES- PA-RESSACA.docx");
        assert_eq!(settings.cache.ttl_secs, 0);
        assert!(!format!("{:?}", settings.store).contains("ghp_secret"));
    }

    #[test]
    fn test_local_backend_needs_no_remote() {
        let settings = Settings::from_toml(
            r#"
            [store]
            backend = "local"
            local_root = "/var/lib/secretaria"
            "#,
        )
        .unwrap();
        assert_eq!(settings.store.backend, BackendKind::Local);
    }

    #[test]
    fn test_category_documents_must_differ() {
        let err = Settings::from_toml(
            r#"
            [store]
            backend = "memory"
            [documents]
            passivos = "alunos.docx"
            concluintes = "alunos.docx"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }
}
