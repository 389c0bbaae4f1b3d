use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde_json::json;
use thiserror::Error;
use token_radar_core::CoreError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Bonding monitor is already running")]
    AlreadyRunning,
    #[error("Bonding monitor is not running")]
    NotRunning,
    #[error("Bonding monitor is still stopping")]
    Stopping,
}

/// Everything a handler can fail with. Rendered as
/// `{ "success": false, "message": .. }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Monitor(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Core(e) => match e {
                CoreError::InvalidInput(_) | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                CoreError::Http(_) | CoreError::UpstreamStatus { .. } | CoreError::Unavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }
        (
            status,
            Json(json!({
                "success": false,
                "message": self.to_string()
            })),
        )
            .into_response()
    }
}
