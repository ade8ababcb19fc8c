//! User administration endpoints.

use super::AppState;
use super::auth::AdminUser;
use crate::error::AppResult;
use crate::types::{CreateUserInput, UpdateUserInput, User};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.db.create_user(input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.db.list_active_users()?))
}

/// PATCH /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    Ok(Json(state.db.update_user(user_id, input)?))
}
