use crate::config::ConfigError;
use crate::leads::{EmailError, PartnerImportError};
use crate::simulation::BaremeError;
use crate::telemetry::TelemetryError;
use crate::validation::FieldErrors;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Bareme(BaremeError),
    Partners(PartnerImportError),
    Email(EmailError),
    Input(FieldErrors),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Server(err) => write!(f, "server error: {err}"),
            AppError::Bareme(err) => write!(f, "fiscal tables error: {err}"),
            AppError::Partners(err) => write!(f, "partner import error: {err}"),
            AppError::Email(err) => write!(f, "email error: {err}"),
            AppError::Input(err) => write!(f, "input error: {err}"),
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
            AppError::Bareme(err) => Some(err),
            AppError::Partners(err) => Some(err),
            AppError::Email(err) => Some(err),
            AppError::Input(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Bareme(_) | AppError::Partners(_) | AppError::Input(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Email(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
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

impl From<BaremeError> for AppError {
    fn from(value: BaremeError) -> Self {
        Self::Bareme(value)
    }
}

impl From<EmailError> for AppError {
    fn from(value: EmailError) -> Self {
        Self::Email(value)
    }
}

impl From<PartnerImportError> for AppError {
    fn from(value: PartnerImportError) -> Self {
        Self::Partners(value)
    }
}

impl From<FieldErrors> for AppError {
    fn from(value: FieldErrors) -> Self {
        Self::Input(value)
    }
}
