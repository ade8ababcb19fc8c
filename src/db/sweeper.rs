//! Overdue sweep: pending tasks past their due date become overdue.

use super::{Database, now_ms};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, info};

impl Database {
    /// Mark every pending task due before now as overdue.
    pub fn sweep_overdue_tasks(&self) -> Result<usize> {
        self.sweep_overdue_tasks_at(Utc::now())
    }

    /// Mark every pending task due strictly before `now` as overdue.
    ///
    /// In-progress, overdue and completed tasks are left alone, so a second
    /// sweep at the same instant touches nothing. Returns the number of tasks
    /// moved.
    pub fn sweep_overdue_tasks_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now.timestamp_millis();
        let stamp = now_ms();

        let moved = self.with_conn(|conn| {
            let moved = conn.execute(
                "UPDATE tasks SET status = 'overdue', updated_at = ?1
                 WHERE status = 'pending' AND due_date < ?2",
                params![stamp, cutoff],
            )?;
            Ok(moved)
        })?;

        if moved > 0 {
            info!(moved, "Marked tasks overdue");
        } else {
            debug!("Overdue sweep found nothing to move");
        }
        Ok(moved)
    }
}
