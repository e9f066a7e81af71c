//! Branding shown by the front end, kept as a JSON document in the store.

use store::{ContentStore, Repository, StoreError, ThemeConfig, VersionToken};

use crate::error::{from_update, CoreError};
use crate::models::AccountInfo;

pub struct ThemeService<S: ContentStore> {
    repo: Repository<S>,
    path: String,
}

impl<S: ContentStore> ThemeService<S> {
    pub fn new(store: S, path: impl Into<String>) -> Self {
        Self {
            repo: Repository::new(store),
            path: path.into(),
        }
    }

    /// The stored theme, or the defaults when it is missing or unreadable.
    pub async fn load(&self) -> ThemeConfig {
        match self.repo.fetch(&self.path).await {
            Ok(doc) => ThemeConfig::from_json_or_default(Some(&doc.content)),
            Err(StoreError::NotFound { .. }) => ThemeConfig::default(),
            Err(e) => {
                tracing::warn!("Using default theme, {} unreadable: {}", self.path, e);
                ThemeConfig::default()
            }
        }
    }

    pub async fn save(
        &self,
        actor: &AccountInfo,
        theme: &ThemeConfig,
    ) -> Result<VersionToken, CoreError> {
        if !actor.is_admin() {
            return Err(CoreError::Unauthorized(
                "only an active administrator can change the theme".to_string(),
            ));
        }
        validate(theme)?;

        let path = self.path.as_str();
        let version = self
            .repo
            .update_or_create(path, "Atualizado tema", |_| {
                theme.to_json().map_err(|e| CoreError::Structural {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            })
            .await
            .map_err(|e| from_update(path, e))?;
        tracing::info!("Theme saved by {} ({})", actor.login_key, version);
        Ok(version)
    }
}

fn validate(theme: &ThemeConfig) -> Result<(), CoreError> {
    if theme.school_name.trim().is_empty() {
        return Err(CoreError::Validation("school name is required".to_string()));
    }
    let color = theme.accent_color.as_bytes();
    if color.len() != 7 || color[0] != b'#' || !color[1..].iter().all(u8::is_ascii_hexdigit) {
        return Err(CoreError::Validation(format!(
            "accent color must look like #1f6feb, got {:?}",
            theme.accent_color
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Status};
    use store::MemoryStore;

    fn account(role: Role) -> AccountInfo {
        AccountInfo {
            login_key: "secretaria".into(),
            display_name: "Secretaria".into(),
            role,
            status: Status::Active,
            unit: String::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_or_broken_theme_is_default() {
        let store = MemoryStore::new();
        let service = ThemeService::new(store.clone(), "config.json");
        assert_eq!(service.load().await, ThemeConfig::default());

        store.insert("config.json", b"[]".to_vec());
        assert_eq!(service.load().await, ThemeConfig::default());
    }

    #[tokio::test]
    async fn test_admin_saves_theme() {
        let store = MemoryStore::new();
        let service = ThemeService::new(store.clone(), "config.json");
        let theme = ThemeConfig {
            school_name: "EMEF PA-RESSACA".into(),
            accent_color: "#0a7f3f".into(),
            logo_url: String::new(),
        };

        let err = service.save(&account(Role::User), &theme).await.unwrap_err();
        assert_eq!(err.code(), "unauthorized");

        service.save(&account(Role::Admin), &theme).await.unwrap();
        service.save(&account(Role::Admin), &theme).await.unwrap();
        assert_eq!(service.load().await, theme);
        assert_eq!(store.history().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_color_is_rejected() {
        let service = ThemeService::new(MemoryStore::new(), "config.json");
        let theme = ThemeConfig {
            accent_color: "blue".into(),
            ..Default::default()
        };
        let err = service.save(&account(Role::Admin), &theme).await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
