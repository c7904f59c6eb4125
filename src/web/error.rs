use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::db::services::execution_service::ExecutionServiceError;
use crate::db::services::import_service::ImportError;
use crate::inventory::FormatError;
use crate::playbooks::PlaybookStoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(format!("io error: {err}"))
    }
}

impl From<FormatError> for AppError {
    fn from(err: FormatError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<PlaybookStoreError> for AppError {
    fn from(err: PlaybookStoreError) -> Self {
        match err {
            PlaybookStoreError::InvalidName(name) => {
                AppError::InvalidInput(format!("Invalid playbook name '{name}'"))
            }
            PlaybookStoreError::NotFound(name) => {
                AppError::NotFound(format!("Playbook '{name}' not found"))
            }
            PlaybookStoreError::Io(err) => {
                AppError::InternalServerError(format!("Playbook storage error: {err}"))
            }
        }
    }
}

impl From<ExecutionServiceError> for AppError {
    fn from(err: ExecutionServiceError) -> Self {
        match err {
            ExecutionServiceError::Validation(msg) => AppError::InvalidInput(msg),
            ExecutionServiceError::NotFound(id) => {
                AppError::NotFound(format!("Execution {id} not found"))
            }
            ExecutionServiceError::Db(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NotFound(id) => AppError::NotFound(format!("Import {id} not found")),
            ImportError::AlreadyProcessed | ImportError::NotRollbackable => {
                AppError::InvalidInput(err.to_string())
            }
            ImportError::Format(e) => AppError::InvalidInput(e.to_string()),
            ImportError::Io(e) => AppError::InternalServerError(format!("Import failed: {e}")),
            ImportError::Db(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}
