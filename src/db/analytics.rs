//! Read-only completion analytics.

use super::codec::decode_list;
use super::users::count_active_users;
use super::{Database, to_ms};
use crate::error::AppError;
use crate::types::{AnalyticsFilter, FormAnalytics, OrganizationAnalytics};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

/// A WHERE clause assembled from optional filters, with numbered placeholders.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl Conditions {
    fn push<T: rusqlite::ToSql + 'static>(&mut self, template: &str, value: T) {
        self.params.push(Box::new(value));
        let placeholder = format!("?{}", self.params.len());
        self.clauses.push(template.replace("?", &placeholder));
    }

    /// Inclusive date bounds on `column`.
    fn date_range(&mut self, column: &str, filter: &AnalyticsFilter) {
        if let Some(from) = filter.date_from {
            self.push(&format!("{} >= ?", column), to_ms(from));
        }
        if let Some(to) = filter.date_to {
            self.push(&format!("{} <= ?", column), to_ms(to));
        }
    }

    fn user(&mut self, column: &str, filter: &AnalyticsFilter) {
        if let Some(user_id) = filter.user_id {
            self.push(&format!("{} = ?", column), user_id);
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

fn count(conn: &Connection, from: &str, conditions: &Conditions) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", from, conditions.where_sql());
    let n: i64 = conn.query_row(&sql, conditions.refs().as_slice(), |row| row.get(0))?;
    Ok(n)
}

/// Percentage rounded to two decimals, zero when the denominator is zero.
fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Database {
    /// Organization-wide task and form counts.
    ///
    /// Date bounds apply to form and task creation time, `user_id` to the task
    /// assignee. Tags are ignored at this level.
    pub fn organization_analytics(&self, filter: &AnalyticsFilter) -> Result<OrganizationAnalytics> {
        self.with_conn(|conn| {
            let mut forms = Conditions::default();
            forms.date_range("created_at", filter);
            let total_forms = count(conn, "forms", &forms)?;

            let task_conditions = || {
                let mut c = Conditions::default();
                c.date_range("created_at", filter);
                c.user("assigned_to", filter);
                c
            };

            let total_tasks = count(conn, "tasks", &task_conditions())?;

            let mut completed = task_conditions();
            completed.push("status = ?", "completed");
            let completed_tasks = count(conn, "tasks", &completed)?;

            let mut overdue = task_conditions();
            overdue.push("status = ?", "overdue");
            let overdue_tasks = count(conn, "tasks", &overdue)?;

            let active_users = count_active_users(conn)?;

            Ok(OrganizationAnalytics {
                total_forms,
                total_tasks,
                completed_tasks,
                overdue_tasks,
                overall_completion_rate: rate(completed_tasks, total_tasks),
                active_users,
            })
        })
    }

    /// Submission metrics for one form.
    ///
    /// A non-empty tag filter that shares no tag with the form yields a zeroed
    /// result. Submissions are filtered on `submitted_at` and `submitted_by`,
    /// the task denominator on `created_at` and `assigned_to`.
    pub fn form_analytics(&self, form_id: i64, filter: &AnalyticsFilter) -> Result<FormAnalytics> {
        self.with_conn(|conn| {
            let (form_title, tags_json): (String, Option<String>) = conn
                .query_row(
                    "SELECT title, tags FROM forms WHERE id = ?1",
                    params![form_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| AppError::form_not_found(form_id))?;
            let tags = decode_list(tags_json);

            if !filter.tags.is_empty() && !filter.tags.iter().any(|t| tags.contains(t)) {
                return Ok(FormAnalytics {
                    form_id,
                    form_title,
                    total_submissions: 0,
                    completion_rate: 0.0,
                    average_completion_time: None,
                    tags,
                });
            }

            let submission_conditions = || {
                let mut c = Conditions::default();
                c.push("s.form_id = ?", form_id);
                c.date_range("s.submitted_at", filter);
                c.user("s.submitted_by", filter);
                c
            };

            let total_submissions = count(conn, "form_submissions s", &submission_conditions())?;

            let mut tasks = Conditions::default();
            tasks.push("form_id = ?", form_id);
            tasks.date_range("created_at", filter);
            tasks.user("assigned_to", filter);
            let total_tasks = count(conn, "tasks", &tasks)?;

            // Ad-hoc submissions without a task can outnumber tasks
            let completion_rate = rate(total_submissions, total_tasks).min(100.0);

            let average_completion_time = if total_submissions > 0 {
                let conditions = submission_conditions();
                let sql = format!(
                    "SELECT AVG((s.submitted_at - t.created_at) / 1000.0)
                     FROM form_submissions s
                     INNER JOIN tasks t ON t.id = s.task_id{}",
                    conditions.where_sql()
                );
                let avg: Option<f64> =
                    conn.query_row(&sql, conditions.refs().as_slice(), |row| row.get(0))?;
                avg
            } else {
                None
            };

            Ok(FormAnalytics {
                form_id,
                form_title,
                total_submissions,
                completion_rate,
                average_completion_time,
                tags,
            })
        })
    }
}
