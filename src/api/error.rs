//! HTTP rendering of `AppError`.

use crate::error::{AppError, ErrorCode};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

/// Status code for each error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,
        ErrorCode::InvalidState | ErrorCode::AlreadyExists => StatusCode::CONFLICT,
        ErrorCode::UserNotFound | ErrorCode::FormNotFound | ErrorCode::TaskNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::InvalidCredentials | ErrorCode::AccountDeactivated | ErrorCode::Unauthorized => {
            StatusCode::UNAUTHORIZED
        }
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::DatabaseError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a AppError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(self.code);
        warn!(
            status = status.as_u16(),
            code = ?self.code,
            field = self.field.as_deref(),
            "Request failed: {}",
            self.message
        );

        // Store and internal failures are not echoed back verbatim
        if status.is_server_error() {
            let generic = AppError::new(self.code, "internal server error");
            (status, Json(ErrorBody { error: &generic })).into_response()
        } else {
            (status, Json(ErrorBody { error: &self })).into_response()
        }
    }
}
