use std::sync::Arc;
use std::time::Duration;

use api::settings::Documents;
use api::{Backend, CredentialStore, DocumentPaths, Notifiers, Roster, Settings, ThemeService};

use crate::error::StartupError;

pub struct AppState {
    pub roster: Roster<Backend>,
    pub credentials: CredentialStore<Backend, Notifiers>,
    pub theme: ThemeService<Backend>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<SharedState, StartupError> {
        let backend = Backend::from_settings(&settings.store)?;
        let notifier = Notifiers::from_settings(&settings.notify)?;
        Ok(Self::new(
            backend,
            &settings.documents,
            Duration::from_secs(settings.cache.ttl_secs),
            &settings.auth.bootstrap_admin,
            notifier,
        ))
    }

    /// All services share one backend.
    pub fn new(
        backend: Backend,
        documents: &Documents,
        cache_ttl: Duration,
        bootstrap_admin: &str,
        notifier: Notifiers,
    ) -> SharedState {
        Arc::new(Self {
            roster: Roster::new(backend.clone(), DocumentPaths::from(documents), cache_ttl),
            credentials: CredentialStore::new(
                backend.clone(),
                documents.users.clone(),
                bootstrap_admin,
                notifier,
            ),
            theme: ThemeService::new(backend, documents.theme.clone()),
        })
    }
}
