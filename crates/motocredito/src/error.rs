use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::telemetry::TelemetryError;
use crate::workflows::credit::router::error_status;
use crate::workflows::credit::CreditServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

const GENERIC_MESSAGE: &str = "Ocurrió un error inesperado. Intente nuevamente.";

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Json(serde_json::Error),
    Auth(AuthError),
    Storage(StorageError),
    Credit(CreditServiceError),
}

impl AppError {
    /// Spanish message shown to back office users.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Auth(err) => err.user_message(),
            AppError::Storage(err) => err.user_message(),
            AppError::Credit(err) => err.user_message(),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Json(_) => GENERIC_MESSAGE,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::InvalidCredentials | AuthError::SessionExpired) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Auth(AuthError::UserNotFound) => StatusCode::NOT_FOUND,
            AppError::Auth(AuthError::EmailInUse) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::WeakPassword) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(AuthError::TooManyRequests) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Auth(AuthError::Unavailable(_))
            | AppError::Storage(StorageError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Credit(err) => error_status(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Json(err) => write!(f, "invalid json: {}", err),
            AppError::Auth(err) => write!(f, "authentication error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Credit(err) => write!(f, "credit workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Auth(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Credit(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "mensaje": self.user_message(),
        }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<CreditServiceError> for AppError {
    fn from(value: CreditServiceError) -> Self {
        Self::Credit(value)
    }
}
