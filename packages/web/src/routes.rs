//! HTTP routes. Handlers only translate between JSON and the `api` services;
//! every rule lives there.

use api::auth::SESSION_LOGIN_KEY;
use api::{AccountInfo, Category, CoreError, NewStudent, Registration, Role, Status, ThemeConfig};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_sessions::cookie::{time, SameSite};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::error::ApiError;
use crate::state::{AppState, SharedState};

/// The full application, session layer included.
pub fn app(state: SharedState, secure_cookies: bool) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(12)));

    router(state).layer(session_layer)
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/theme", get(get_theme).put(put_theme))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/students", get(search_students).post(append_student))
        .route("/api/dashboard", get(dashboard))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{login}/status", post(set_status))
        .route("/api/admin/users/{login}/role", post(set_role))
        .route("/api/admin/users/{login}/password", post(reset_password))
        .route("/api/admin/documents/init", post(init_documents))
        .with_state(state)
}

/// The logged-in account, re-read from the credential document so that a
/// disabled account loses access on its next request.
async fn current_account(state: &AppState, session: &Session) -> Result<AccountInfo, ApiError> {
    let Some(login_key) = session.get::<String>(SESSION_LOGIN_KEY).await? else {
        return Err(ApiError::Unauthenticated);
    };
    match state.credentials.find(&login_key).await? {
        Some(account) if account.status == Status::Active => Ok(account),
        _ => {
            session.flush().await?;
            Err(ApiError::Unauthenticated)
        }
    }
}

async fn current_admin(state: &AppState, session: &Session) -> Result<AccountInfo, ApiError> {
    let account = current_account(state, session).await?;
    if !account.is_admin() {
        return Err(CoreError::Unauthorized("administrators only".to_string()).into());
    }
    Ok(account)
}

async fn start_session(session: &Session, account: &AccountInfo) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(SESSION_LOGIN_KEY, &account.login_key).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn get_theme(State(state): State<SharedState>) -> Json<ThemeConfig> {
    Json(state.theme.load().await)
}

async fn put_theme(
    State(state): State<SharedState>,
    session: Session,
    Json(theme): Json<ThemeConfig>,
) -> Result<Json<ThemeConfig>, ApiError> {
    let actor = current_account(&state, &session).await?;
    state.theme.save(&actor, &theme).await?;
    Ok(Json(theme))
}

async fn register(
    State(state): State<SharedState>,
    session: Session,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<AccountInfo>), ApiError> {
    let account = state.credentials.register(&registration).await?;
    if account.status == Status::Active {
        start_session(&session, &account).await?;
    }
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Deserialize)]
struct LoginRequest {
    login_key: String,
    password: String,
}

async fn login(
    State(state): State<SharedState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AccountInfo>, ApiError> {
    let account = state
        .credentials
        .authenticate(&request.login_key, &request.password)
        .await
        .map_err(|e| match e {
            CoreError::Unauthorized(message) => ApiError::LoginFailed(message),
            other => other.into(),
        })?;
    start_session(&session, &account).await?;
    tracing::info!("{} logged in", account.login_key);
    Ok(Json(account))
}

async fn logout(session: Session) -> Result<StatusCode, ApiError> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<Option<AccountInfo>>, ApiError> {
    match current_account(&state, &session).await {
        Ok(account) => Ok(Json(Some(account))),
        Err(ApiError::Unauthenticated) => Ok(Json(None)),
        Err(e) => Err(e),
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_students(
    State(state): State<SharedState>,
    session: Session,
    Query(params): Query<SearchParams>,
) -> Result<Json<api::SearchResult>, ApiError> {
    current_account(&state, &session).await?;
    Ok(Json(state.roster.search(&params.q).await))
}

#[derive(Deserialize)]
struct AppendRequest {
    category: Category,
    #[serde(flatten)]
    student: NewStudent,
}

async fn append_student(
    State(state): State<SharedState>,
    session: Session,
    Json(request): Json<AppendRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let actor = current_account(&state, &session).await?;
    let version = state
        .roster
        .append(request.category, &request.student)
        .await?;
    tracing::info!("{} added a {} record", actor.login_key, request.category);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "version": version })),
    ))
}

async fn dashboard(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<api::Dashboard>, ApiError> {
    current_account(&state, &session).await?;
    Ok(Json(state.roster.dashboard().await))
}

async fn list_users(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<Vec<AccountInfo>>, ApiError> {
    let actor = current_account(&state, &session).await?;
    Ok(Json(state.credentials.list(&actor.login_key).await?))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: Status,
}

async fn set_status(
    State(state): State<SharedState>,
    session: Session,
    Path(login): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<AccountInfo>, ApiError> {
    let actor = current_account(&state, &session).await?;
    let account = state
        .credentials
        .set_status(&actor.login_key, &login, request.status)
        .await?;
    Ok(Json(account))
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

async fn set_role(
    State(state): State<SharedState>,
    session: Session,
    Path(login): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<AccountInfo>, ApiError> {
    let actor = current_account(&state, &session).await?;
    let account = state
        .credentials
        .set_role(&actor.login_key, &login, request.role)
        .await?;
    Ok(Json(account))
}

#[derive(Deserialize)]
struct PasswordRequest {
    password: String,
}

async fn reset_password(
    State(state): State<SharedState>,
    session: Session,
    Path(login): Path<String>,
    Json(request): Json<PasswordRequest>,
) -> Result<Json<AccountInfo>, ApiError> {
    let actor = current_account(&state, &session).await?;
    let account = state
        .credentials
        .reset_password(&actor.login_key, &login, &request.password)
        .await?;
    Ok(Json(account))
}

async fn init_documents(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    current_admin(&state, &session).await?;
    let mut created = Vec::new();
    for category in Category::ALL {
        if state.roster.ensure_document(category).await? {
            created.push(category);
        }
    }
    Ok(Json(json!({ "ok": true, "created": created })))
}
