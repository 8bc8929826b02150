use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

/// Maps `telecast_engine::Error` to HTTP status (§7, §10.2): the
/// `*NotInDatabase` kinds and `InvalidTranscriptSearch` are `InvalidUsage`
/// subclasses in the original (`app/error.py`) and map to 400 like it does;
/// `QueryTooExpensive` is client-correctable (cost gate or ids cap) so also
/// 400; index/corruption/internal-invariant failures are 500.
impl From<telecast_engine::Error> for AppError {
    fn from(err: telecast_engine::Error) -> Self {
        use telecast_engine::Error::*;
        match &err {
            InvalidUsage(_) | VideoNotInDatabase(_) | PersonNotInDatabase(_)
            | TagNotInDatabase(_) | InvalidTranscriptSearch(_) | QueryTooExpensive(_) => {
                Self::bad_request(err.to_string())
            }
            Index { .. } | Corrupt { .. } | Json(_) | Unreachable(_) => {
                tracing::error!(error = %err, "internal engine error");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<telecast_config::ConfigLoadError> for AppError {
    fn from(err: telecast_config::ConfigLoadError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("malformed JSON: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
