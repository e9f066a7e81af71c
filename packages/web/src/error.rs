use api::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error returned by every handler.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("login required")]
    Unauthenticated,

    #[error("{0}")]
    LoginFailed(String),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::Conflict { .. } => StatusCode::CONFLICT,
                CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Fetch { .. } => StatusCode::BAD_GATEWAY,
                CoreError::Structural { .. } | CoreError::Store { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthenticated | ApiError::LoginFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.code(),
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::LoginFailed(_) => "login_failed",
            ApiError::Session(_) => "session",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = json!({
            "ok": false,
            "error": { "code": self.code(), "message": self.to_string() },
        });
        (status, Json(body)).into_response()
    }
}

/// Failures while starting the server.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] api::SettingsError),

    #[error("could not open the document store: {0}")]
    Store(#[from] store::StoreError),

    #[error("could not set up notifications: {0}")]
    Notify(#[from] api::notify::NotifyError),

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::Conflict { path: "a".into() }, StatusCode::CONFLICT),
            (CoreError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (
                CoreError::Fetch {
                    path: "a".into(),
                    reason: "down".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                CoreError::Structural {
                    path: "a".into(),
                    reason: "no table".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
