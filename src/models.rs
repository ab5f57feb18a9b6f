use chrono::{DateTime, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::errors::{AppError, AppResult};

/// Represents a single task the user tracks day by day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Short handle used on the command line. Unique within one data directory only.
    pub id: u64,
    /// Stable identity shared with every mirror of the task.
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Short title shown in lists. Never empty.
    pub title: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// When the task occurs.
    pub schedule: Schedule,
    /// Day the task was created. One-time tasks exist only on this day.
    pub created_on: NaiveDate,
    /// Timestamp of the last change made to the task.
    #[serde(default)]
    pub modified_at: Option<DateTime<Local>>,
    /// `uuid` of the recurring task this one was split from, if any.
    #[serde(default)]
    pub original_task_id: Option<Uuid>,
    /// Days on which the task was completed.
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,
    /// Days on which an otherwise available instance is skipped.
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
}

impl Task {
    /// Builds a task, rejecting blank titles.
    pub fn new(id: u64, title: &str, description: Option<String>, schedule: Schedule, created_on: NaiveDate) -> AppResult<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::EmptyTitle);
        }
        Ok(Task {
            id,
            uuid: Uuid::new_v4(),
            title: title.to_string(),
            description: description.filter(|d| !d.trim().is_empty()),
            schedule,
            created_on,
            modified_at: None,
            original_task_id: None,
            completed_dates: BTreeSet::new(),
            excluded_dates: BTreeSet::new(),
        })
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, Schedule::Recurring(_))
    }

    pub fn recurrence(&self) -> Option<&Recurrence> {
        match &self.schedule {
            Schedule::Recurring(r) => Some(r),
            Schedule::OneTime => None,
        }
    }
}

/// When a task occurs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Exists on its creation day only.
    OneTime,
    /// Repeats on a set of weekdays.
    Recurring(Recurrence),
}

/// Weekday rules of a recurring task.
///
/// `weekdays` applies from `effective_from` (or from creation when unset).
/// Days before `effective_from` are judged by the latest entry of
/// `revisions` that had started by then.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub weekdays: WeekdaySet,
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<Revision>,
    /// First day the series no longer occurs (soft delete).
    #[serde(default)]
    pub ends_on: Option<NaiveDate>,
}

impl Recurrence {
    pub fn new(weekdays: WeekdaySet) -> Recurrence {
        Recurrence { weekdays, effective_from: None, revisions: Vec::new(), ends_on: None }
    }

    pub fn daily() -> Recurrence {
        Recurrence::new(WeekdaySet::ALL)
    }
}

/// Weekday rule that was in force from `from` until the next revision.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub from: NaiveDate,
    pub weekdays: WeekdaySet,
}

/// Compact set of weekdays, serialized as a list of names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Weekday>", into = "Vec<Weekday>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    pub fn toggle(&mut self, day: Weekday) {
        self.0 ^= Self::bit(day);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the contained days, Monday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        std::iter::successors(Some(Weekday::Mon), |d| Some(d.succ()))
            .take(7)
            .filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl From<Vec<Weekday>> for WeekdaySet {
    fn from(days: Vec<Weekday>) -> Self {
        days.into_iter().collect()
    }
}

impl From<WeekdaySet> for Vec<Weekday> {
    fn from(set: WeekdaySet) -> Self {
        set.iter().collect()
    }
}

/// Parses `daily`, `weekdays`, `weekends` or a comma separated list such as `mon,wed,fri`.
impl FromStr for WeekdaySet {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "all" => return Ok(WeekdaySet::ALL),
            "weekdays" => return Ok([Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri].into_iter().collect()),
            "weekends" => return Ok([Weekday::Sat, Weekday::Sun].into_iter().collect()),
            _ => {}
        }
        let mut set = WeekdaySet::EMPTY;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day = part.parse::<Weekday>().map_err(|_| AppError::InvalidWeekday(part.to_string()))?;
            set.insert(day);
        }
        if set.is_empty() {
            return Err(AppError::NoWeekdays);
        }
        Ok(set)
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == WeekdaySet::ALL {
            return write!(f, "Daily");
        }
        let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", names.join(" "))
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A once-per-day rating of progress relative to the previous day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyReflection {
    pub id: Uuid,
    pub date: NaiveDate,
    pub rating: Rating,
    pub tasks_completed: u32,
    pub total_tasks: u32,
}

impl DailyReflection {
    /// Builds a reflection, rejecting more completed tasks than available ones.
    pub fn new(date: NaiveDate, rating: Rating, tasks_completed: u32, total_tasks: u32) -> AppResult<DailyReflection> {
        DailyReflection::with_id(Uuid::new_v4(), date, rating, tasks_completed, total_tasks)
    }

    /// Like [`DailyReflection::new`], keeping an existing identity.
    pub fn with_id(id: Uuid, date: NaiveDate, rating: Rating, tasks_completed: u32, total_tasks: u32) -> AppResult<DailyReflection> {
        if tasks_completed > total_tasks {
            return Err(AppError::InvalidReflection { completed: tasks_completed, total: total_tasks });
        }
        Ok(DailyReflection { id, date, rating, tasks_completed, total_tasks })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Better,
    Same,
    Worse,
}

impl Rating {
    /// Feedback shown after the rating is recorded.
    pub fn message(self) -> &'static str {
        match self {
            Rating::Better => "Congratulations! Keep up the great work!",
            Rating::Same => "At least you didn't fall behind. Aim to be better tomorrow!",
            Rating::Worse => "Remember your goals. Every day is a new opportunity to improve!",
        }
    }

    /// Contribution to the cumulative progress chart.
    pub fn score(self) -> i32 {
        match self {
            Rating::Better => 1,
            Rating::Same => 0,
            Rating::Worse => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Better => "better",
            Rating::Same => "same",
            Rating::Worse => "worse",
        }
    }
}

impl FromStr for Rating {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "better" | "b" => Ok(Rating::Better),
            "same" | "s" => Ok(Rating::Same),
            "worse" | "w" => Ok(Rating::Worse),
            _ => Err(AppError::InvalidRating(s.to_string())),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
