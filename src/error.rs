// src/error.rs

use std::fmt;

/// Global Application Error Enum.
/// Every service returns one of these; the calling layer decides how to present it.
#[derive(Debug)]
pub enum AppError {
    /// Entity id does not resolve.
    NotFound(String),

    /// Uniqueness violation on a question title or a category name.
    DuplicateName(String),

    /// Delete blocked by foreign references. `count` is the number of referencing rows.
    ReferencedEntity { message: String, count: i64 },

    /// Structurally disallowed action (e.g. deleting a root category).
    InvalidOperation(String),

    /// Input failed validation.
    BadRequest(String),

    /// AI output did not contain the fenced JSON block or it could not be parsed.
    /// `content` keeps the raw model output for diagnosis.
    MalformedAiResponse { reason: String, content: String },

    /// AI call failed on every attempt. `last` is the error of the final attempt.
    AiUnavailable { attempts: u32, last: Box<AppError> },

    /// Transport failure talking to the AI endpoint.
    Upstream(String),

    /// Missing or unparsable configuration.
    Config(String),

    /// Storage or other unexpected failure.
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        AppError::NotFound(format!("{} {} does not exist", entity, id))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
            AppError::DuplicateName(msg) => write!(f, "duplicate name: {}", msg),
            AppError::ReferencedEntity { message, .. } => write!(f, "still referenced: {}", message),
            AppError::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
            AppError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            AppError::MalformedAiResponse { reason, .. } => {
                write!(f, "malformed AI response: {}", reason)
            }
            AppError::AiUnavailable { attempts, last } => {
                write!(f, "AI service unavailable after {} attempts: {}", attempts, last)
            }
            AppError::Upstream(msg) => write!(f, "upstream error: {}", msg),
            AppError::Config(msg) => write!(f, "configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::AiUnavailable { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

/// Converts `sqlx::Error` into `AppError::Internal`.
/// Unique-constraint violations (SQLSTATE 23505) become `DuplicateName`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::DuplicateName(db_err.message().to_string());
            }
        }
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
