//! Task endpoints.

use super::AppState;
use super::auth::{AdminUser, AuthUser};
use crate::error::AppResult;
use crate::types::{CreateTaskInput, Task, UpdateTaskStatusInput};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// POST /api/tasks. The caller becomes the assigner.
pub async fn create_task(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<CreateTaskInput>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = state.db.create_task(input, admin.id)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks. Runs the overdue sweep before reading.
pub async fn list_all_tasks(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<Task>>> {
    Ok(Json(state.db.list_all_tasks()?))
}

/// GET /api/users/{id}/tasks
pub async fn list_tasks_by_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<Task>>> {
    Ok(Json(state.db.list_tasks_by_user(user_id)?))
}

/// PATCH /api/tasks/{id}/status
pub async fn update_task_status(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(task_id): Path<i64>,
    Json(input): Json<UpdateTaskStatusInput>,
) -> AppResult<Json<Task>> {
    Ok(Json(state.db.update_task_status(task_id, input.status)?))
}
