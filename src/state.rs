//! In-memory application state and the commands that change it.
//!
//! Front-ends never mutate tasks or reflections directly: they build a
//! [`Command`], hand it to [`AppState::apply`] and persist what the returned
//! [`Outcome`] reports as changed.

use chrono::{Duration, NaiveDate};
use log::debug;
use uuid::Uuid;
use crate::calendar;
use crate::errors::{AppError, AppResult};
use crate::models::{DailyReflection, Rating, Schedule, Task, WeekdaySet};
use crate::progress::completion_stats;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub reflections: Vec<DailyReflection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTask {
        title: String,
        description: Option<String>,
        schedule: Schedule,
        on: NaiveDate,
    },
    SetCompletion {
        id: u64,
        date: NaiveDate,
        completed: bool,
    },
    ToggleCompletion {
        id: u64,
        date: NaiveDate,
    },
    EditTask {
        id: u64,
        title: Option<String>,
        description: Option<String>,
        weekdays: Option<WeekdaySet>,
        /// First day the new weekdays apply.
        effective: NaiveDate,
    },
    /// Removes a task, or ends a recurring series from `from`.
    DeleteTask {
        id: u64,
        from: Option<NaiveDate>,
    },
    IgnoreForDay {
        id: u64,
        date: NaiveDate,
    },
    UnignoreForDay {
        id: u64,
        date: NaiveDate,
    },
    MoveToNextDay {
        id: u64,
        from: NaiveDate,
    },
    RecordReflection {
        date: NaiveDate,
        rating: Rating,
    },
}

/// Records touched by a command.
///
/// Created and updated tasks are named by their short id; removed tasks by
/// `uuid`, since they can no longer be looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub created: Vec<u64>,
    pub updated: Vec<u64>,
    pub removed: Vec<Uuid>,
    pub reflection: Option<Uuid>,
}

impl Outcome {
    fn created(id: u64) -> Outcome {
        Outcome { created: vec![id], ..Outcome::default() }
    }

    fn updated(id: u64) -> Outcome {
        Outcome { updated: vec![id], ..Outcome::default() }
    }

    fn removed(uuid: Uuid) -> Outcome {
        Outcome { removed: vec![uuid], ..Outcome::default() }
    }
}

impl AppState {
    pub fn new(tasks: Vec<Task>, reflections: Vec<DailyReflection>) -> AppState {
        AppState { tasks, reflections }
    }

    /// Applies `command`, returning which records changed.
    ///
    /// On error the state is left untouched.
    pub fn apply(&mut self, command: Command) -> AppResult<Outcome> {
        debug!("applying {:?}", command);
        match command {
            Command::AddTask { title, description, schedule, on } => {
                if let Schedule::Recurring(rec) = &schedule {
                    if rec.weekdays.is_empty() {
                        return Err(AppError::NoWeekdays);
                    }
                }
                let task = Task::new(self.next_task_id(), &title, description, schedule, on)?;
                let id = task.id;
                self.tasks.push(task);
                Ok(Outcome::created(id))
            }
            Command::SetCompletion { id, date, completed } => {
                let task = self.task_mut(id)?;
                calendar::toggle_completion(task, date, completed);
                Ok(Outcome::updated(id))
            }
            Command::ToggleCompletion { id, date } => {
                let task = self.task_mut(id)?;
                let completed = calendar::is_completed(task, date);
                calendar::toggle_completion(task, date, !completed);
                Ok(Outcome::updated(id))
            }
            Command::EditTask { id, title, description, weekdays, effective } => {
                let mut task = self.task(id)?.clone();
                if let Some(title) = title {
                    let title = title.trim();
                    if title.is_empty() {
                        return Err(AppError::EmptyTitle);
                    }
                    task.title = title.to_string();
                }
                if let Some(description) = description {
                    task.description = Some(description).filter(|d| !d.trim().is_empty());
                }
                if let Some(days) = weekdays {
                    calendar::reschedule(&mut task, days, effective)?;
                }
                task.modified_at = Some(chrono::Local::now());
                self.replace(task);
                Ok(Outcome::updated(id))
            }
            Command::DeleteTask { id, from } => {
                let task = self.task_mut(id)?;
                match (task.is_recurring(), from) {
                    (true, Some(day)) => {
                        calendar::end_series(task, day)?;
                        Ok(Outcome::updated(id))
                    }
                    _ => {
                        let uuid = task.uuid;
                        self.tasks.retain(|t| t.id != id);
                        Ok(Outcome::removed(uuid))
                    }
                }
            }
            Command::IgnoreForDay { id, date } => {
                calendar::exclude(self.task_mut(id)?, date)?;
                Ok(Outcome::updated(id))
            }
            Command::UnignoreForDay { id, date } => {
                calendar::include(self.task_mut(id)?, date)?;
                Ok(Outcome::updated(id))
            }
            Command::MoveToNextDay { id, from } => self.move_to_next_day(id, from),
            Command::RecordReflection { date, rating } => {
                let stats = completion_stats(&self.tasks, date);
                let id = self.reflection_on(date).map(|r| r.id).unwrap_or_else(Uuid::new_v4);
                let reflection = DailyReflection::with_id(id, date, rating, stats.completed, stats.available)?;
                self.reflections.retain(|r| r.date != date);
                self.reflections.push(reflection);
                Ok(Outcome { reflection: Some(id), ..Outcome::default() })
            }
        }
    }

    /// Postpones the instance of `id` on `from` to the following day.
    ///
    /// Only a pending instance that actually occurs on `from` can move.
    fn move_to_next_day(&mut self, id: u64, from: NaiveDate) -> AppResult<Outcome> {
        let next_id = self.next_task_id();
        let task = self.task_mut(id)?;
        if !calendar::is_available(task, from) {
            return Err(AppError::NotScheduled(id, from));
        }
        if calendar::is_completed(task, from) {
            return Err(AppError::AlreadyDone(id, from));
        }
        let tomorrow = from + Duration::days(1);
        let mut copy = Task::new(next_id, &task.title, task.description.clone(), Schedule::OneTime, tomorrow)?;
        copy.modified_at = Some(chrono::Local::now());

        let mut outcome = Outcome::created(next_id);
        if task.is_recurring() {
            calendar::exclude(task, from)?;
            copy.original_task_id = Some(task.uuid);
            outcome.updated.push(id);
        } else {
            copy.original_task_id = task.original_task_id;
            outcome.removed.push(task.uuid);
            self.tasks.retain(|t| t.id != id);
        }
        self.tasks.push(copy);
        Ok(outcome)
    }

    pub fn task(&self, id: u64) -> AppResult<&Task> {
        self.tasks.iter().find(|t| t.id == id).ok_or(AppError::TaskNotFound(id))
    }

    fn task_mut(&mut self, id: u64) -> AppResult<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id).ok_or(AppError::TaskNotFound(id))
    }

    fn replace(&mut self, task: Task) {
        if let Some(t) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *t = task;
        }
    }

    fn next_task_id(&self) -> u64 {
        next_task_id(&self.tasks)
    }

    /// Tasks with an instance on `date`, in creation order.
    pub fn tasks_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks.iter().filter(|t| calendar::is_available(t, date)).collect()
    }

    /// Recurring tasks skipped on `date`.
    pub fn ignored_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_recurring() && t.excluded_dates.contains(&date))
            .collect()
    }

    pub fn recurring_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_recurring()).collect()
    }

    pub fn reflection_on(&self, date: NaiveDate) -> Option<&DailyReflection> {
        self.reflections.iter().find(|r| r.date == date)
    }

    /// Reflections sorted most recent first.
    pub fn reflections_by_recency(&self) -> Vec<&DailyReflection> {
        let mut sorted: Vec<&DailyReflection> = self.reflections.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }
}

/// Next free short id: one past the largest in use.
pub fn next_task_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}
