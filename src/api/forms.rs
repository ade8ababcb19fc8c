//! Form endpoints.

use super::AppState;
use super::auth::AuthUser;
use crate::error::AppResult;
use crate::types::{CreateFormInput, Form, FormWithFields, UpdateFormInput};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// POST /api/forms
pub async fn create_form(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(input): Json<CreateFormInput>,
) -> AppResult<(StatusCode, Json<Form>)> {
    let form = state.db.create_form(input, caller.id)?;
    Ok((StatusCode::CREATED, Json(form)))
}

/// GET /api/forms
pub async fn list_forms(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> AppResult<Json<Vec<Form>>> {
    Ok(Json(state.db.list_active_forms()?))
}

/// GET /api/forms/{id}
pub async fn get_form(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(form_id): Path<i64>,
) -> AppResult<Json<FormWithFields>> {
    Ok(Json(state.db.require_form_with_fields(form_id)?))
}

/// PATCH /api/forms/{id}
pub async fn update_form(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(form_id): Path<i64>,
    Json(input): Json<UpdateFormInput>,
) -> AppResult<Json<Form>> {
    Ok(Json(state.db.update_form(form_id, input)?))
}
