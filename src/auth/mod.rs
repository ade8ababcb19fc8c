//! Authentication: password hashing, login, and bearer token handling.

pub mod password;
pub mod token;

pub use token::{Claims, TokenError, TokenService};

use crate::db::Database;
use crate::error::AppError;
use crate::types::{LoginInput, LoginOutput, User};
use anyhow::Result;
use tracing::{info, warn};

/// Verify credentials and issue a bearer token.
///
/// Unknown emails and wrong passwords fail identically so callers cannot probe
/// which accounts exist.
pub fn login(db: &Database, tokens: &TokenService, input: &LoginInput) -> Result<LoginOutput> {
    let user = match db.get_user_by_email(input.email.trim())? {
        Some(user) => user,
        None => {
            warn!("Login rejected: unknown email");
            return Err(AppError::invalid_credentials().into());
        }
    };

    if !password::verify_password(&input.password, &user.password_hash) {
        warn!(user_id = user.id, "Login rejected: bad password");
        return Err(AppError::invalid_credentials().into());
    }

    if !user.is_active {
        warn!(user_id = user.id, "Login rejected: account deactivated");
        return Err(AppError::account_deactivated().into());
    }

    let token = tokens.issue(&user).map_err(AppError::internal)?;
    info!(user_id = user.id, "User logged in");

    Ok(LoginOutput {
        token,
        user: user.summary(),
    })
}

/// Resolve a bearer token to a live, active user.
///
/// The user row is re-read on every call so role changes and deactivation
/// take effect before the token expires.
pub fn authenticate(db: &Database, tokens: &TokenService, token: &str) -> Result<User> {
    let claims = tokens
        .verify(token)
        .map_err(|e| AppError::unauthorized(e.to_string()))?;

    let user = db
        .get_user(claims.sub)?
        .ok_or_else(|| AppError::unauthorized("token subject no longer exists"))?;

    if !user.is_active {
        return Err(AppError::account_deactivated().into());
    }

    Ok(user)
}

/// Fail with FORBIDDEN unless `user` is an admin.
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("admin role required"))
    }
}
