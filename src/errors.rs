use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// A required source table could not be found or opened.
    InputMissing(String),
    /// A source table is structurally wrong or holds an unparseable value.
    InputMalformed(String),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid query parameters).
    BadRequest(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Builds an `InputMalformed` error pointing at a data row and column.
    ///
    /// Rows are numbered from 1, excluding the header line.
    pub fn malformed_at(table: &str, row: usize, column: &str, detail: impl fmt::Display) -> Self {
        AppError::InputMalformed(format!(
            "{} table, row {}, column {}: {}",
            table, row, column, detail
        ))
    }

    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputMissing(msg) => write!(f, "Input missing: {}", msg),
            AppError::InputMalformed(msg) => write!(f, "Input malformed: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Input errors surface as 422 since the request itself was fine but the
    /// source tables could not be turned into a dataset.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InputMissing(msg) => {
                tracing::error!("Input missing: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::InputMalformed(msg) => {
                tracing::error!("Input malformed: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (*source.clone()).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<csv::Error> for AppError {
    /// Converts a `csv::Error` into an `AppError`.
    ///
    /// I/O failures while reading keep their own classification, everything
    /// else the reader reports is a structural problem with the table.
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => AppError::from(io),
                other => AppError::InputMalformed(format!("{:?}", other)),
            }
        } else {
            AppError::InputMalformed(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    /// Converts a `std::io::Error` into an `AppError`.
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::InputMissing(err.to_string()),
            _ => AppError::InternalError(err.to_string()),
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
