//! Structured error types for API responses.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidState,

    // Not found errors
    UserNotFound,
    FormNotFound,
    TaskNotFound,

    // Conflict errors
    AlreadyExists,

    // Auth errors
    InvalidCredentials,
    AccountDeactivated,
    Unauthorized,
    Forbidden,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error carried through `anyhow` and rendered at the HTTP boundary.
#[derive(Debug, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, reason)
    }

    pub fn user_not_found(user_id: i64) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User with id {} not found", user_id),
        )
    }

    pub fn form_not_found(form_id: i64) -> Self {
        Self::new(
            ErrorCode::FormNotFound,
            format!("Form with id {} not found", form_id),
        )
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task with id {} not found", task_id),
        )
    }

    pub fn email_taken(email: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyExists,
            format!("User with email {} already exists", email),
        )
        .with_field("email")
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid email or password")
    }

    pub fn account_deactivated() -> Self {
        Self::new(ErrorCode::AccountDeactivated, "Account is deactivated")
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, reason)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, reason)
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

// Recover the structured error from an anyhow chain; store failures become DATABASE_ERROR
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AppError>() {
            Ok(app_err) => return app_err,
            Err(err) => err,
        };
        match err.downcast::<rusqlite::Error>() {
            Ok(db_err) => AppError::database(db_err),
            Err(err) => AppError::internal(err),
        }
    }
}

/// Result type for API operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
