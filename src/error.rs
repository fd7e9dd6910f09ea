// error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Device configuration incomplete: {0} is not set")]
    NotConfigured(&'static str),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Response format error: {0}")]
    Format(String),
    #[error("Device error: {0}")]
    Device(String),
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Timeouts and connection failures are worth another attempt with a
    /// longer ceiling; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedCommand(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotConfigured(_) => StatusCode::CONFLICT,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Connection(_) | Self::Format(_) | Self::Device(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tapo::Error> for AppError {
    fn from(err: tapo::Error) -> Self {
        match &err {
            tapo::Error::Http(e) if e.is_timeout() => Self::Timeout(err.to_string()),
            tapo::Error::Http(e) if e.is_connect() => Self::Connection(err.to_string()),
            tapo::Error::Serde(_) => Self::Format(err.to_string()),
            _ => {
                // Some firmware surfaces read timeouts only through the message.
                let message = err.to_string();
                let lowered = message.to_lowercase();
                if lowered.contains("timeout") || lowered.contains("timed out") {
                    Self::Timeout(message)
                } else {
                    Self::Device(message)
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
