//! Form and form field CRUD.

use super::codec::{decode_list, decode_optional_list, encode_list};
use super::{Database, from_ms, now_ms, row_exists};
use crate::error::AppError;
use crate::types::{CreateFormInput, Form, FormField, FormFieldInput, FormWithFields, UpdateFormInput};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;
use tracing::info;

const FORM_COLUMNS: &str =
    "id, title, description, tags, is_active, created_by, created_at, updated_at";

pub fn parse_form_row(row: &Row) -> rusqlite::Result<Form> {
    let tags_json: Option<String> = row.get("tags")?;

    Ok(Form {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        tags: decode_list(tags_json),
        is_active: row.get("is_active")?,
        created_by: row.get("created_by")?,
        created_at: from_ms(row.get("created_at")?),
        updated_at: from_ms(row.get("updated_at")?),
    })
}

fn parse_field_row(row: &Row) -> rusqlite::Result<FormField> {
    let options_json: Option<String> = row.get("field_options")?;

    Ok(FormField {
        id: row.get("id")?,
        form_id: row.get("form_id")?,
        field_type: row.get("field_type")?,
        field_label: row.get("field_label")?,
        field_key: row.get("field_key")?,
        is_required: row.get("is_required")?,
        field_options: decode_optional_list(options_json),
        field_order: row.get("field_order")?,
        created_at: from_ms(row.get("created_at")?),
    })
}

/// Internal helper to get a form using an existing connection.
pub(crate) fn get_form_internal(conn: &Connection, form_id: i64) -> Result<Option<Form>> {
    let sql = format!("SELECT {} FROM forms WHERE id = ?1", FORM_COLUMNS);
    let form = conn
        .query_row(&sql, params![form_id], parse_form_row)
        .optional()?;
    Ok(form)
}

fn get_fields_internal(conn: &Connection, form_id: i64) -> Result<Vec<FormField>> {
    let mut stmt = conn.prepare(
        "SELECT id, form_id, field_type, field_label, field_key, is_required,
                field_options, field_order, created_at
         FROM form_fields
         WHERE form_id = ?1
         ORDER BY field_order ASC",
    )?;
    let fields = stmt
        .query_map(params![form_id], parse_field_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fields)
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::missing_field("title").into());
    }
    Ok(())
}

/// Field keys and orders must each be unique within a form.
fn validate_fields(fields: &[FormFieldInput]) -> Result<()> {
    let mut keys = HashSet::new();
    let mut orders = HashSet::new();

    for field in fields {
        if field.field_label.trim().is_empty() {
            return Err(AppError::missing_field("field_label").into());
        }
        if field.field_key.trim().is_empty() {
            return Err(AppError::missing_field("field_key").into());
        }
        if !keys.insert(field.field_key.as_str()) {
            return Err(AppError::invalid_value(
                "field_key",
                format!("duplicate field_key '{}'", field.field_key),
            )
            .into());
        }
        if !orders.insert(field.field_order) {
            return Err(AppError::invalid_value(
                "field_order",
                format!("duplicate field_order {}", field.field_order),
            )
            .into());
        }
    }
    Ok(())
}

impl Database {
    /// Create a form together with its fields in one transaction.
    pub fn create_form(&self, input: CreateFormInput, creator_id: i64) -> Result<Form> {
        validate_title(&input.title)?;
        validate_fields(&input.fields)?;

        let tags_json = encode_list(input.tags.as_deref().unwrap_or_default())?;
        let now = now_ms();

        let form = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !row_exists(&tx, "users", creator_id)? {
                return Err(AppError::user_not_found(creator_id).into());
            }

            tx.execute(
                "INSERT INTO forms (
                    title, description, tags, is_active, created_by, created_at, updated_at
                ) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
                params![
                    &input.title,
                    &input.description,
                    tags_json,
                    creator_id,
                    now,
                    now,
                ],
            )?;
            let form_id = tx.last_insert_rowid();

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO form_fields (
                        form_id, field_type, field_label, field_key, is_required,
                        field_options, field_order, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for field in &input.fields {
                    let options_json = match &field.field_options {
                        Some(options) => Some(serde_json::to_string(options)?),
                        None => None,
                    };
                    stmt.execute(params![
                        form_id,
                        field.field_type,
                        &field.field_label,
                        &field.field_key,
                        field.is_required,
                        options_json,
                        field.field_order,
                        now,
                    ])?;
                }
            }

            let form = get_form_internal(&tx, form_id)?
                .ok_or_else(|| AppError::form_not_found(form_id))?;
            tx.commit()?;
            Ok(form)
        })?;

        info!(
            form_id = form.id,
            fields = input.fields.len(),
            created_by = creator_id,
            "Created form"
        );
        Ok(form)
    }

    /// Get a form by id.
    pub fn get_form(&self, form_id: i64) -> Result<Option<Form>> {
        self.with_conn(|conn| get_form_internal(conn, form_id))
    }

    /// Get a form with its fields ordered by `field_order`.
    pub fn get_form_with_fields(&self, form_id: i64) -> Result<Option<FormWithFields>> {
        self.with_conn(|conn| {
            let Some(form) = get_form_internal(conn, form_id)? else {
                return Ok(None);
            };
            let fields = get_fields_internal(conn, form_id)?;
            Ok(Some(FormWithFields { form, fields }))
        })
    }

    /// Get a form with fields, failing with FORM_NOT_FOUND if absent.
    pub fn require_form_with_fields(&self, form_id: i64) -> Result<FormWithFields> {
        self.get_form_with_fields(form_id)?
            .ok_or_else(|| AppError::form_not_found(form_id).into())
    }

    /// List active forms whose creator still exists, newest first.
    pub fn list_active_forms(&self) -> Result<Vec<Form>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.title, f.description, f.tags, f.is_active, f.created_by,
                        f.created_at, f.updated_at
                 FROM forms f
                 INNER JOIN users u ON u.id = f.created_by
                 WHERE f.is_active = 1
                 ORDER BY f.created_at DESC, f.id DESC",
            )?;
            let forms = stmt
                .query_map([], parse_form_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(forms)
        })
    }

    /// Apply a partial update to a form. An empty tag list clears the tags.
    pub fn update_form(&self, form_id: i64, input: UpdateFormInput) -> Result<Form> {
        if let Some(ref title) = input.title {
            validate_title(title)?;
        }

        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing =
                get_form_internal(&tx, form_id)?.ok_or_else(|| AppError::form_not_found(form_id))?;

            let title = input.title.as_deref().unwrap_or(&existing.title);
            let description = match &input.description {
                Some(description) => description.clone(),
                None => existing.description.clone(),
            };
            let tags_json = encode_list(input.tags.as_deref().unwrap_or(&existing.tags))?;
            let is_active = input.is_active.unwrap_or(existing.is_active);

            tx.execute(
                "UPDATE forms SET title = ?1, description = ?2, tags = ?3, is_active = ?4,
                    updated_at = ?5
                 WHERE id = ?6",
                params![title, description, tags_json, is_active, now, form_id],
            )?;

            let form =
                get_form_internal(&tx, form_id)?.ok_or_else(|| AppError::form_not_found(form_id))?;
            tx.commit()?;
            Ok(form)
        })
    }
}
