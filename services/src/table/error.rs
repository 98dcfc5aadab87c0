//! Errors raised while answering a listing request.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// A request parameter was missing its contract.
///
/// `field` names the offending parameter group (`page`, `pageSize`, `start`,
/// `sort`, `sortDirection`, `filter`, `draw`) and is part of the public
/// error shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Error type for the table pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Bad or unsupported request parameters. Raised before the source is touched.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The record source could not be read. Never retried here.
    #[error("record source unavailable: {0}")]
    SourceUnavailable(String),

    /// An internal contract was broken; this is a defect, not a user error.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl TableError {
    /// Stable machine-readable kind, used as the `error` member of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned by the listing endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl From<&TableError> for TableErrorResponse {
    fn from(err: &TableError) -> Self {
        let field = match err {
            TableError::Validation(v) => Some(v.field.to_owned()),
            _ => None,
        };
        Self {
            error: err.kind().to_owned(),
            field,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for TableError {
    fn into_response(self) -> Response {
        match &self {
            Self::Validation(err) => {
                tracing::debug!(field = err.field, "Rejected listing request: {}", err);
            }
            Self::SourceUnavailable(reason) => {
                tracing::warn!("Record source unavailable: {}", reason);
            }
            Self::InvariantViolation(reason) => {
                tracing::error!("Listing invariant violated: {}", reason);
            }
        }

        (self.status(), Json(TableErrorResponse::from(&self))).into_response()
    }
}
