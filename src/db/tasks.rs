//! Task CRUD and the status lifecycle, including recurrence chaining.

use super::{Database, from_ms, now_ms, row_exists, to_ms};
use crate::error::AppError;
use crate::recurrence;
use crate::types::{CreateTaskInput, RecurrenceType, Task, TaskStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};

const TASK_COLUMNS: &str = "id, form_id, assigned_to, assigned_by, title, due_date, status,
     recurrence_type, recurrence_interval, next_due_date, spawned_from, created_at, updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let next_due: Option<i64> = row.get("next_due_date")?;

    Ok(Task {
        id: row.get("id")?,
        form_id: row.get("form_id")?,
        assigned_to: row.get("assigned_to")?,
        assigned_by: row.get("assigned_by")?,
        title: row.get("title")?,
        due_date: from_ms(row.get("due_date")?),
        status: row.get("status")?,
        recurrence_type: row.get("recurrence_type")?,
        recurrence_interval: row.get("recurrence_interval")?,
        next_due_date: next_due.map(from_ms),
        spawned_from: row.get("spawned_from")?,
        created_at: from_ms(row.get("created_at")?),
        updated_at: from_ms(row.get("updated_at")?),
    })
}

/// Internal helper to get a task using an existing connection.
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    let task = conn
        .query_row(&sql, params![task_id], parse_task_row)
        .optional()?;
    Ok(task)
}

fn query_tasks(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks {} ORDER BY due_date ASC, id ASC",
        TASK_COLUMNS, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params, parse_task_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// Returns the interval to persist: NULL for non-recurring tasks.
///
/// A recurring interval must produce a representable next due date.
fn validate_recurrence(
    due_date: DateTime<Utc>,
    recurrence_type: RecurrenceType,
    interval: Option<i32>,
) -> Result<Option<i32>> {
    if !recurrence_type.is_recurring() {
        return Ok(None);
    }
    match interval {
        Some(n) if n < 1 => Err(AppError::invalid_value(
            "recurrence_interval",
            "recurrence_interval must be at least 1",
        )
        .into()),
        Some(n) if recurrence::advance(due_date, recurrence_type, Some(n)).is_none() => {
            Err(AppError::invalid_value(
                "recurrence_interval",
                "recurrence_interval moves the due date out of range",
            )
            .into())
        }
        other => Ok(other),
    }
}

/// Insert the successor of a completed recurring task.
///
/// The successor's due date is computed from the original's due date, not
/// from the completion time.
fn spawn_successor(conn: &Connection, original: &Task, now: i64) -> Result<Option<i64>> {
    let Some(interval) = original.recurrence_interval else {
        return Ok(None);
    };
    let Some(next_due) =
        recurrence::advance(original.due_date, original.recurrence_type, Some(interval))
    else {
        if original.recurrence_type.is_recurring() {
            return Err(AppError::invalid_state(format!(
                "Task {} cannot recur: next due date is out of range",
                original.id
            ))
            .into());
        }
        return Ok(None);
    };

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO tasks (
            form_id, assigned_to, assigned_by, title, due_date, status,
            recurrence_type, recurrence_interval, next_due_date, spawned_from,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, NULL, ?8, ?9, ?10)",
        params![
            original.form_id,
            original.assigned_to,
            original.assigned_by,
            &original.title,
            to_ms(next_due),
            original.recurrence_type,
            original.recurrence_interval,
            original.id,
            now,
            now,
        ],
    )?;

    // spawned_from is unique; a zero row count means the successor already exists
    if inserted == 0 {
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

impl Database {
    /// Assign a form to a user as a task.
    pub fn create_task(&self, input: CreateTaskInput, assigner_id: i64) -> Result<Task> {
        if input.title.trim().is_empty() {
            return Err(AppError::missing_field("title").into());
        }
        let interval = validate_recurrence(
            input.due_date,
            input.recurrence_type,
            input.recurrence_interval,
        )?;
        let next_due = recurrence::advance(input.due_date, input.recurrence_type, interval);
        let now = now_ms();

        let task = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !row_exists(&tx, "forms", input.form_id)? {
                return Err(AppError::form_not_found(input.form_id).into());
            }
            if !row_exists(&tx, "users", input.assigned_to)? {
                return Err(AppError::user_not_found(input.assigned_to)
                    .with_field("assigned_to")
                    .into());
            }
            if !row_exists(&tx, "users", assigner_id)? {
                return Err(AppError::user_not_found(assigner_id)
                    .with_field("assigned_by")
                    .into());
            }

            tx.execute(
                "INSERT INTO tasks (
                    form_id, assigned_to, assigned_by, title, due_date, status,
                    recurrence_type, recurrence_interval, next_due_date,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, ?10)",
                params![
                    input.form_id,
                    input.assigned_to,
                    assigner_id,
                    &input.title,
                    to_ms(input.due_date),
                    input.recurrence_type,
                    interval,
                    next_due.map(to_ms),
                    now,
                    now,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            let task =
                get_task_internal(&tx, task_id)?.ok_or_else(|| AppError::task_not_found(task_id))?;
            tx.commit()?;
            Ok(task)
        })?;

        info!(
            task_id = task.id,
            form_id = task.form_id,
            assigned_to = task.assigned_to,
            recurrence = %task.recurrence_type,
            "Created task"
        );
        Ok(task)
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Get a task by id, failing with TASK_NOT_FOUND if absent.
    pub fn require_task(&self, task_id: i64) -> Result<Task> {
        self.get_task(task_id)?
            .ok_or_else(|| AppError::task_not_found(task_id).into())
    }

    /// Move a task to `status`.
    ///
    /// Completing a recurring task inserts its pending successor in the same
    /// transaction. Completed tasks are terminal: completing again is a no-op
    /// and any other target status fails with INVALID_STATE. Returns the
    /// updated task; the successor is only visible through list queries.
    pub fn update_task_status(&self, task_id: i64, status: TaskStatus) -> Result<Task> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            // Take the write lock up front so concurrent completions serialize
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let task =
                get_task_internal(&tx, task_id)?.ok_or_else(|| AppError::task_not_found(task_id))?;

            if task.status == TaskStatus::Completed {
                if status == TaskStatus::Completed {
                    debug!(task_id, "Task already completed");
                    return Ok(task);
                }
                return Err(AppError::invalid_state(format!(
                    "task {} is completed and cannot move to {}",
                    task_id, status
                ))
                .into());
            }

            tx.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, now, task_id],
            )?;

            if status == TaskStatus::Completed
                && let Some(successor_id) = spawn_successor(&tx, &task, now)?
            {
                info!(
                    task_id,
                    successor_id,
                    recurrence = %task.recurrence_type,
                    "Spawned recurring task"
                );
            }

            let updated =
                get_task_internal(&tx, task_id)?.ok_or_else(|| AppError::task_not_found(task_id))?;
            tx.commit()?;
            Ok(updated)
        })
    }

    /// List every task, marking past-due pending tasks overdue first.
    pub fn list_all_tasks(&self) -> Result<Vec<Task>> {
        self.sweep_overdue_tasks()?;
        self.with_conn(|conn| query_tasks(conn, "", &[]))
    }

    /// List tasks assigned to `user_id`. Does not run the overdue sweep.
    pub fn list_tasks_by_user(&self, user_id: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                "WHERE assigned_to = ?1",
                &[&user_id as &dyn rusqlite::ToSql],
            )
        })
    }
}
