//! Availability and completion rules for a task on a given day.
//!
//! Everything here is re-derived from the task's own fields on every call;
//! nothing is cached between calls.

use chrono::{Datelike, Local, NaiveDate};
use crate::errors::{AppError, AppResult};
use crate::models::{Recurrence, Revision, Schedule, Task, WeekdaySet};

/// Returns whether an instance of `task` exists on `date`.
///
/// - Excluded days are never available.
/// - One-time tasks are available on their creation day only.
/// - Recurring tasks are available from creation until `ends_on`, on the
///   weekdays in force for that day.
pub fn is_available(task: &Task, date: NaiveDate) -> bool {
    if task.excluded_dates.contains(&date) {
        return false;
    }
    match &task.schedule {
        Schedule::OneTime => date == task.created_on,
        Schedule::Recurring(rec) => {
            if date < task.created_on {
                return false;
            }
            if rec.ends_on.is_some_and(|end| date >= end) {
                return false;
            }
            match weekdays_in_force(rec, date) {
                Some(days) => days.contains(date.weekday()),
                // Older records forked without keeping the prior rule.
                None => true,
            }
        }
    }
}

/// Weekday rule that applies on `date`, or `None` when the day predates the
/// effective date and no earlier revision was kept.
fn weekdays_in_force(rec: &Recurrence, date: NaiveDate) -> Option<WeekdaySet> {
    match rec.effective_from {
        Some(effective) if date < effective => rec
            .revisions
            .iter()
            .filter(|r| r.from <= date)
            .max_by_key(|r| r.from)
            .map(|r| r.weekdays),
        _ => Some(rec.weekdays),
    }
}

/// Returns whether `task` was completed on `date`.
pub fn is_completed(task: &Task, date: NaiveDate) -> bool {
    task.completed_dates.contains(&date)
}

/// Sets the completion state for `date`. Repeating the same call is a no-op
/// apart from refreshing the modification time.
pub fn toggle_completion(task: &mut Task, date: NaiveDate, completed: bool) {
    if completed {
        task.completed_dates.insert(date);
    } else {
        task.completed_dates.remove(&date);
    }
    touch(task);
}

/// Returns `(available, completed)` as 0/1 counts for `date`.
pub fn completion_count(task: &Task, date: NaiveDate) -> (u32, u32) {
    if !is_available(task, date) {
        return (0, 0);
    }
    (1, u32::from(is_completed(task, date)))
}

/// Skips the instance of a recurring task on `date`.
pub fn exclude(task: &mut Task, date: NaiveDate) -> AppResult<()> {
    if !task.is_recurring() {
        return Err(AppError::NotRecurring(task.id));
    }
    task.excluded_dates.insert(date);
    touch(task);
    Ok(())
}

/// Restores a previously skipped instance.
pub fn include(task: &mut Task, date: NaiveDate) -> AppResult<()> {
    if !task.is_recurring() {
        return Err(AppError::NotRecurring(task.id));
    }
    task.excluded_dates.remove(&date);
    touch(task);
    Ok(())
}

/// Applies a new weekday rule from `effective` onwards.
///
/// Days before `effective` keep the rule that was in force for them, so past
/// availability and completion history stay as they were. A one-time task
/// becomes recurring from its creation day.
pub fn reschedule(task: &mut Task, weekdays: WeekdaySet, effective: NaiveDate) -> AppResult<()> {
    if weekdays.is_empty() {
        return Err(AppError::NoWeekdays);
    }
    let created_on = task.created_on;
    if let Schedule::Recurring(rec) = &mut task.schedule {
        if effective <= created_on {
            rec.weekdays = weekdays;
            rec.effective_from = None;
            rec.revisions.clear();
        } else {
            let current_from = rec.effective_from.unwrap_or(created_on);
            rec.revisions.retain(|r| r.from < effective);
            if current_from < effective {
                rec.revisions.push(Revision { from: current_from, weekdays: rec.weekdays });
            }
            rec.weekdays = weekdays;
            rec.effective_from = Some(effective);
        }
    } else {
        task.schedule = Schedule::Recurring(Recurrence::new(weekdays));
    }
    touch(task);
    Ok(())
}

/// Stops a recurring series from `from` onwards, keeping earlier history.
pub fn end_series(task: &mut Task, from: NaiveDate) -> AppResult<()> {
    match &mut task.schedule {
        Schedule::Recurring(rec) => {
            rec.ends_on = Some(from);
            touch(task);
            Ok(())
        }
        Schedule::OneTime => Err(AppError::NotRecurring(task.id)),
    }
}

fn touch(task: &mut Task) {
    task.modified_at = Some(Local::now());
}
