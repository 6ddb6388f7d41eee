use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

use crate::models::application::ApplicationStatus;

pub type Result<T> = std::result::Result<T, Error>;

const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    ValidationErrors(#[from] validator::ValidationErrors),

    #[error("Referential error: {0}")]
    Referential(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Application {0} was modified concurrently")]
    ConcurrentModification(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::ValidationErrors(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Referential(_) | Error::InvalidTransition { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ConcurrentModification(_) | Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Storage(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error_message = match &self {
            Error::Storage(err) => {
                tracing::error!(error = ?err, "Storage failure");
                "An unexpected error occurred".to_string()
            }
            Error::Config(_) | Error::Internal(_) => {
                tracing::error!(error = %self, "Internal failure");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                let constraint = db_err.constraint().map(str::to_string);
                match code.as_deref() {
                    Some(PG_FOREIGN_KEY_VIOLATION) => Error::Referential(match constraint {
                        Some(c) => format!("Referenced entity does not exist ({})", c),
                        None => "Referenced entity does not exist".to_string(),
                    }),
                    Some(PG_UNIQUE_VIOLATION) => Error::Conflict(match constraint {
                        Some(c) => format!("Duplicate value violates {}", c),
                        None => "Duplicate value".to_string(),
                    }),
                    _ => Error::Storage(sqlx::Error::Database(db_err)),
                }
            }
            other => Error::Storage(other),
        }
    }
}
