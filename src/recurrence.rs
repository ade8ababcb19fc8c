//! Due-date arithmetic for recurring tasks.

use crate::types::RecurrenceType;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};

/// Compute the due date one recurrence step after `due`.
///
/// Returns `None` for non-recurring tasks, a missing or non-positive interval,
/// or a result outside the representable date range.
///
/// Monthly steps carry the day-of-month forward; when the target month is too
/// short the surplus days spill into the next month, so Jan 31 + 1 month lands
/// on Mar 2 (leap year) or Mar 3. Time of day is preserved.
pub fn advance(
    due: DateTime<Utc>,
    recurrence: RecurrenceType,
    interval: Option<i32>,
) -> Option<DateTime<Utc>> {
    let interval = interval.filter(|n| *n > 0)?;

    match recurrence {
        RecurrenceType::None => None,
        RecurrenceType::Daily => due.checked_add_signed(Duration::days(i64::from(interval))),
        RecurrenceType::Weekly => {
            due.checked_add_signed(Duration::days(i64::from(interval) * 7))
        }
        RecurrenceType::Monthly => add_months_overflowing(due, interval),
    }
}

fn add_months_overflowing(due: DateTime<Utc>, months: i32) -> Option<DateTime<Utc>> {
    let naive = due.naive_utc();
    let month_index = (naive.month0() as i32).checked_add(months)?;
    let year = naive.year().checked_add(month_index.div_euclid(12))?;
    let month = month_index.rem_euclid(12) as u32 + 1;

    let date = NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_days(Days::new(u64::from(naive.day() - 1)))?;

    Some(date.and_time(naive.time()).and_utc())
}
