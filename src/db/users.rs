//! User CRUD.

use super::{Database, from_ms, now_ms};
use crate::auth::password;
use crate::error::AppError;
use crate::types::{CreateUserInput, UpdateUserInput, User};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at";

pub fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        role: row.get("role")?,
        is_active: row.get("is_active")?,
        created_at: from_ms(row.get("created_at")?),
        updated_at: from_ms(row.get("updated_at")?),
    })
}

/// Internal helper to get a user using an existing connection.
pub(crate) fn get_user_internal(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let user = conn
        .query_row(&sql, params![user_id], parse_user_row)
        .optional()?;
    Ok(user)
}

fn email_owner(conn: &Connection, email: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1 COLLATE NOCASE",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::invalid_value("email", "email must be a valid address").into());
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::missing_field(field).into());
    }
    Ok(())
}

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

impl Database {
    /// Create a user, hashing the supplied password.
    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        validate_email(&input.email)?;
        validate_name("first_name", &input.first_name)?;
        validate_name("last_name", &input.last_name)?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::invalid_value(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            )
            .into());
        }

        let password_hash = password::hash_password(&input.password)?;
        let now = now_ms();

        let user = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if email_owner(&tx, &input.email)?.is_some() {
                return Err(AppError::email_taken(&input.email).into());
            }

            tx.execute(
                "INSERT INTO users (
                    email, password_hash, first_name, last_name, role, is_active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
                params![
                    &input.email,
                    &password_hash,
                    &input.first_name,
                    &input.last_name,
                    input.role,
                    now,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let user = get_user_internal(&tx, id)?.ok_or_else(|| AppError::user_not_found(id))?;

            tx.commit()?;
            Ok(user)
        })?;

        info!(user_id = user.id, role = %user.role, "Created user");
        Ok(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// Look up a user by email (case-insensitive).
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE email = ?1 COLLATE NOCASE",
                USER_COLUMNS
            );
            let user = conn
                .query_row(&sql, params![email], parse_user_row)
                .optional()?;
            Ok(user)
        })
    }

    /// List active users, oldest first.
    pub fn list_active_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE is_active = 1 ORDER BY id ASC",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let users = stmt
                .query_map([], parse_user_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    /// Apply a partial update to a user.
    pub fn update_user(&self, user_id: i64, input: UpdateUserInput) -> Result<User> {
        if let Some(ref email) = input.email {
            validate_email(email)?;
        }
        if let Some(ref first_name) = input.first_name {
            validate_name("first_name", first_name)?;
        }
        if let Some(ref last_name) = input.last_name {
            validate_name("last_name", last_name)?;
        }

        let now = now_ms();

        let user = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing =
                get_user_internal(&tx, user_id)?.ok_or_else(|| AppError::user_not_found(user_id))?;

            if let Some(ref email) = input.email
                && let Some(owner) = email_owner(&tx, email)?
                && owner != user_id
            {
                return Err(AppError::email_taken(email).into());
            }

            tx.execute(
                "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, role = ?4,
                    is_active = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    input.email.as_deref().unwrap_or(&existing.email),
                    input.first_name.as_deref().unwrap_or(&existing.first_name),
                    input.last_name.as_deref().unwrap_or(&existing.last_name),
                    input.role.unwrap_or(existing.role),
                    input.is_active.unwrap_or(existing.is_active),
                    now,
                    user_id,
                ],
            )?;

            let user =
                get_user_internal(&tx, user_id)?.ok_or_else(|| AppError::user_not_found(user_id))?;
            tx.commit()?;
            Ok(user)
        })?;

        info!(user_id, is_active = user.is_active, "Updated user");
        Ok(user)
    }
}

/// Count users with `is_active = true`.
pub(crate) fn count_active_users(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users WHERE is_active = 1", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}
