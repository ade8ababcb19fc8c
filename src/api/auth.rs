//! Bearer token extractors and the login endpoint.

use super::AppState;
use crate::auth;
use crate::error::{AppError, AppResult};
use crate::types::{LoginInput, LoginOutput, User};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
};

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let (prefix, rest) = value.trim().split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_authorization_bearer)
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let user = auth::authenticate(&state.db, &state.tokens, token)?;
        Ok(AuthUser(user))
    }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        auth::require_admin(&user)?;
        Ok(AdminUser(user))
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<LoginOutput>> {
    let output = auth::login(&state.db, &state.tokens, &input)?;
    Ok(Json(output))
}
