//! Submission endpoints.

use super::AppState;
use super::auth::AuthUser;
use crate::error::AppResult;
use crate::types::{CreateFormSubmissionInput, FormSubmission, SubmissionRecord};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SubmissionListQuery {
    pub form_id: Option<i64>,
}

/// POST /api/submissions. The caller is recorded as submitter.
pub async fn create_submission(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(input): Json<CreateFormSubmissionInput>,
) -> AppResult<(StatusCode, Json<FormSubmission>)> {
    let submission = state.db.create_submission(input, caller.id)?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/submissions?form_id=
pub async fn list_submissions(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Query(query): Query<SubmissionListQuery>,
) -> AppResult<Json<Vec<SubmissionRecord>>> {
    Ok(Json(state.db.list_submissions(query.form_id)?))
}
