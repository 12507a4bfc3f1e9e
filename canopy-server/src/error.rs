//! Error types for the server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use canopy::ConfigurationError;
use error_stack::Report;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid selection: {0}")]
    Configuration(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<Report<ConfigurationError>> for ServerError {
    fn from(report: Report<ConfigurationError>) -> Self {
        ServerError::Configuration(report.current_context().to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Dataset(_) | ServerError::Io(_) | ServerError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
