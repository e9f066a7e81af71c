//! `secretaria`: HTTP server for the school secretariat's student lists.
//!
//! Reads its configuration (see [`api::settings`]), opens the configured
//! document store and serves the JSON API on `server.bind`.

mod error;
mod routes;
mod state;

use api::Settings;
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::new()?;
    tracing::info!("Store settings: {:?}", settings.store);
    let state = AppState::from_settings(&settings)?;
    let app = routes::app(state, settings.server.secure_cookies);

    let addr = settings.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
