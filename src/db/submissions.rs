//! Form submissions.

use super::codec::{decode_submission, encode_submission};
use super::{Database, from_ms, now_ms, row_exists};
use crate::error::AppError;
use crate::types::{CreateFormSubmissionInput, FormSubmission, SubmissionRecord};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Row, params};
use tracing::info;

fn parse_submission_row(row: &Row) -> rusqlite::Result<FormSubmission> {
    let raw: String = row.get("submission_data")?;
    let data = decode_submission(&raw).map_err(|e| {
        let idx = row.as_ref().column_index("submission_data").unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })?;

    Ok(FormSubmission {
        id: row.get("id")?,
        form_id: row.get("form_id")?,
        task_id: row.get("task_id")?,
        submitted_by: row.get("submitted_by")?,
        submission_data: data,
        submitted_at: from_ms(row.get("submitted_at")?),
    })
}

fn parse_record_row(row: &Row) -> rusqlite::Result<SubmissionRecord> {
    let first: String = row.get("first_name")?;
    let last: String = row.get("last_name")?;

    Ok(SubmissionRecord {
        submission: parse_submission_row(row)?,
        submitter_name: format!("{} {}", first, last),
        submitter_email: row.get("email")?,
        form_title: row.get("form_title")?,
    })
}

impl Database {
    /// Record a submission.
    ///
    /// When the submission names a task, that task is forced to completed in
    /// the same transaction. This path never spawns a recurring successor.
    pub fn create_submission(
        &self,
        input: CreateFormSubmissionInput,
        submitter_id: i64,
    ) -> Result<FormSubmission> {
        let data = encode_submission(&input.submission_data)?;
        let now = now_ms();

        let submission = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !row_exists(&tx, "forms", input.form_id)? {
                return Err(AppError::form_not_found(input.form_id).into());
            }
            if let Some(task_id) = input.task_id
                && !row_exists(&tx, "tasks", task_id)?
            {
                return Err(AppError::task_not_found(task_id).into());
            }
            if !row_exists(&tx, "users", submitter_id)? {
                return Err(AppError::user_not_found(submitter_id)
                    .with_field("submitted_by")
                    .into());
            }

            tx.execute(
                "INSERT INTO form_submissions (form_id, task_id, submitted_by, submission_data, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![input.form_id, input.task_id, submitter_id, data, now],
            )?;
            let submission_id = tx.last_insert_rowid();

            if let Some(task_id) = input.task_id {
                tx.execute(
                    "UPDATE tasks SET status = 'completed', updated_at = ?1 WHERE id = ?2",
                    params![now, task_id],
                )?;
            }

            let submission = tx.query_row(
                "SELECT id, form_id, task_id, submitted_by, submission_data, submitted_at
                 FROM form_submissions WHERE id = ?1",
                params![submission_id],
                parse_submission_row,
            )?;
            tx.commit()?;
            Ok(submission)
        })?;

        info!(
            submission_id = submission.id,
            form_id = submission.form_id,
            task_id = ?submission.task_id,
            submitted_by = submitter_id,
            "Recorded submission"
        );
        Ok(submission)
    }

    /// List submissions with submitter and form details, newest first.
    pub fn list_submissions(&self, form_id: Option<i64>) -> Result<Vec<SubmissionRecord>> {
        self.with_conn(|conn| {
            let mut sql = String::from(
                "SELECT s.id, s.form_id, s.task_id, s.submitted_by, s.submission_data,
                        s.submitted_at, u.first_name, u.last_name, u.email,
                        f.title AS form_title
                 FROM form_submissions s
                 INNER JOIN users u ON u.id = s.submitted_by
                 INNER JOIN forms f ON f.id = s.form_id",
            );
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(form_id) = form_id {
                sql.push_str(" WHERE s.form_id = ?1");
                params_vec.push(Box::new(form_id));
            }
            sql.push_str(" ORDER BY s.submitted_at DESC, s.id DESC");

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params_refs.as_slice(), parse_record_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }
}
