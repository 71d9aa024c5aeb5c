//! Service errors and their HTTP representation.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{ErrorBody, FieldError, TaskId};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TaskError {
    /// One entry per rejected field.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Task with id {0} not found")]
    NotFound(TaskId),

    /// A transition the task state machine forbids.
    #[error("{0}")]
    BusinessRule(String),

    /// The request could not be decoded (body, query string or path).
    #[error("{0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TaskError {
    pub fn status(&self) -> StatusCode {
        match self {
            TaskError::Validation(_)
            | TaskError::BusinessRule(_)
            | TaskError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorBody {
        match self {
            TaskError::Validation(errors) => ErrorBody::Fields { errors },
            // Store failures are logged, never echoed to clients.
            TaskError::Store(error) => {
                tracing::error!(%error, "task store failure");
                ErrorBody::Message {
                    error: "An internal error occurred".to_string(),
                }
            }
            other => ErrorBody::Message {
                error: other.to_string(),
            },
        }
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for TaskError {
    fn from(rejection: JsonRejection) -> Self {
        TaskError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for TaskError {
    fn from(rejection: QueryRejection) -> Self {
        TaskError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for TaskError {
    fn from(rejection: PathRejection) -> Self {
        TaskError::MalformedRequest(rejection.body_text())
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
