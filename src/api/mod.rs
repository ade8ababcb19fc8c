//! JSON HTTP API.
//!
//! Every route lives under `/api`. Handlers are thin: they resolve the caller
//! from the bearer token, call into `Database`, and render `AppError` on
//! failure.

pub mod analytics;
pub mod auth;
pub mod error;
pub mod forms;
pub mod submissions;
pub mod tasks;
pub mod users;

use crate::auth::TokenService;
use crate::db::Database;
use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, patch, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(db: Arc<Database>, tokens: TokenService) -> Self {
        Self { db, tokens }
    }
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        // Users
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/{id}", patch(users::update_user))
        .route("/users/{id}/tasks", get(tasks::list_tasks_by_user))
        // Forms
        .route("/forms", post(forms::create_form).get(forms::list_forms))
        .route("/forms/{id}", get(forms::get_form).patch(forms::update_form))
        // Tasks
        .route("/tasks", post(tasks::create_task).get(tasks::list_all_tasks))
        .route("/tasks/{id}/status", patch(tasks::update_task_status))
        // Submissions
        .route(
            "/submissions",
            post(submissions::create_submission).get(submissions::list_submissions),
        )
        // Analytics
        .route("/analytics/forms/{id}", get(analytics::form_analytics))
        .route(
            "/analytics/organization",
            get(analytics::organization_analytics),
        );

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr: SocketAddr = listener.local_addr()?;
    info!("API listening on http://{}", bound_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("API server shutting down");
        })
        .await?;

    Ok(())
}
