//! Mirroring of tasks and reflections to a document database.
//!
//! Records are flat JSON objects whose field names and encodings (epoch
//! seconds for days, Sunday-based weekday numbers) are shared with other
//! clients of the same database. The local store stays authoritative for
//! writes: a failed mirror is logged and the local write stands.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Weekday};
use log::{debug, warn};
use serde_json::{json, Map, Value};
use uuid::Uuid;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::{DailyReflection, Recurrence, Revision, Schedule, Task, WeekdaySet};
use crate::state::{next_task_id, AppState, Outcome};
use crate::storage::Store;

/// A document as stored in the database.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Task,
    DailyReflection,
}

impl RecordType {
    pub fn name(self) -> &'static str {
        match self {
            RecordType::Task => "Task",
            RecordType::DailyReflection => "DailyReflection",
        }
    }
}

/// Per-record access to a document database.
pub trait CloudDatabase {
    /// Inserts or replaces the record identified by its `id` field.
    fn save(&mut self, kind: RecordType, record: Record) -> AppResult<()>;
    fn fetch_all(&self, kind: RecordType) -> AppResult<Vec<Record>>;
    /// Deleting a missing record is not an error.
    fn delete(&mut self, kind: RecordType, id: &str) -> AppResult<()>;
}

// ---------------------------
// Field encodings
// ---------------------------

fn day_to_epoch(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn epoch_to_day(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

fn days_to_epochs<'a>(days: impl IntoIterator<Item = &'a NaiveDate>) -> Vec<i64> {
    days.into_iter().map(|d| day_to_epoch(*d)).collect()
}

fn weekday_to_number(day: Weekday) -> u32 {
    day.number_from_sunday()
}

fn number_to_weekday(n: u64) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Sun),
        2 => Some(Weekday::Mon),
        3 => Some(Weekday::Tue),
        4 => Some(Weekday::Wed),
        5 => Some(Weekday::Thu),
        6 => Some(Weekday::Fri),
        7 => Some(Weekday::Sat),
        _ => None,
    }
}

fn weekdays_to_numbers(set: WeekdaySet) -> Vec<u32> {
    set.iter().map(weekday_to_number).collect()
}

fn numbers_to_weekdays(value: &Value) -> Option<WeekdaySet> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_u64().and_then(number_to_weekday))
        .collect::<Option<Vec<Weekday>>>()
        .map(WeekdaySet::from)
}

fn epochs_to_days(value: &Value) -> Option<Vec<NaiveDate>> {
    value.as_array()?.iter().map(|v| v.as_i64().and_then(epoch_to_day)).collect()
}

// ---------------------------
// Task mapping
// ---------------------------

pub fn task_to_record(task: &Task) -> Record {
    let (weekdays, effective, revisions, ends_on) = match &task.schedule {
        Schedule::OneTime => (WeekdaySet::EMPTY, task.created_on, Vec::new(), None),
        Schedule::Recurring(rec) => (
            rec.weekdays,
            rec.effective_from.unwrap_or(task.created_on),
            rec.revisions.clone(),
            rec.ends_on,
        ),
    };
    let modified = task
        .modified_at
        .map(|m| m.timestamp())
        .unwrap_or_else(|| day_to_epoch(task.created_on));

    let mut record = Record::new();
    record.insert("id".into(), json!(task.uuid.to_string()));
    record.insert("shortId".into(), json!(task.id));
    record.insert("title".into(), json!(task.title));
    record.insert("description".into(), json!(task.description.clone().unwrap_or_default()));
    record.insert("isRecurring".into(), json!(task.is_recurring()));
    record.insert("completedDates".into(), json!(days_to_epochs(&task.completed_dates)));
    record.insert("excludedDates".into(), json!(days_to_epochs(&task.excluded_dates)));
    record.insert("creationDate".into(), json!(day_to_epoch(task.created_on)));
    record.insert("lastModifiedDate".into(), json!(modified));
    if let Some(original) = task.original_task_id {
        record.insert("originalTaskId".into(), json!(original.to_string()));
    }
    record.insert("selectedDays".into(), json!(weekdays_to_numbers(weekdays)));
    record.insert("effectiveDate".into(), json!(day_to_epoch(effective)));
    if !revisions.is_empty() {
        let revs: Vec<Value> = revisions
            .iter()
            .map(|r| json!({ "from": day_to_epoch(r.from), "selectedDays": weekdays_to_numbers(r.weekdays) }))
            .collect();
        record.insert("revisions".into(), Value::Array(revs));
    }
    if let Some(end) = ends_on {
        record.insert("endsOn".into(), json!(day_to_epoch(end)));
    }
    record
}

/// Rebuilds a task, or `None` when a required field is missing or malformed.
///
/// A record without `shortId` gets id 0; [`Repository::load_state`]
/// assigns it a free one.
pub fn task_from_record(record: &Record) -> Option<Task> {
    let uuid = Uuid::parse_str(record.get("id")?.as_str()?).ok()?;
    let id = match record.get("shortId") {
        Some(v) => v.as_u64()?,
        None => 0,
    };
    let title = record.get("title")?.as_str()?;
    let description = record.get("description")?.as_str()?.to_string();
    let is_recurring = record.get("isRecurring")?.as_bool()?;
    let completed = epochs_to_days(record.get("completedDates")?)?;
    let excluded = epochs_to_days(record.get("excludedDates")?)?;
    let created_on = epoch_to_day(record.get("creationDate")?.as_i64()?)?;
    let modified = DateTime::from_timestamp(record.get("lastModifiedDate")?.as_i64()?, 0)?;
    let weekdays = numbers_to_weekdays(record.get("selectedDays")?)?;
    let effective = epoch_to_day(record.get("effectiveDate")?.as_i64()?)?;

    let schedule = if is_recurring {
        let revisions = match record.get("revisions") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|r| {
                    Some(Revision {
                        from: epoch_to_day(r.get("from")?.as_i64()?)?,
                        weekdays: numbers_to_weekdays(r.get("selectedDays")?)?,
                    })
                })
                .collect::<Option<Vec<Revision>>>()?,
            _ => Vec::new(),
        };
        let ends_on = match record.get("endsOn") {
            Some(v) => Some(epoch_to_day(v.as_i64()?)?),
            None => None,
        };
        Schedule::Recurring(Recurrence {
            // Records written before weekday selection existed repeat daily.
            weekdays: if weekdays.is_empty() { WeekdaySet::ALL } else { weekdays },
            effective_from: (effective > created_on).then_some(effective),
            revisions,
            ends_on,
        })
    } else {
        Schedule::OneTime
    };

    let mut task = Task::new(id, title, Some(description), schedule, created_on).ok()?;
    task.uuid = uuid;
    task.modified_at = Some(modified.with_timezone(&Local));
    task.original_task_id = match record.get("originalTaskId") {
        Some(Value::String(s)) => Some(Uuid::parse_str(s).ok()?),
        _ => None,
    };
    task.completed_dates = completed.into_iter().collect();
    task.excluded_dates = excluded.into_iter().collect();
    Some(task)
}

// ---------------------------
// Reflection mapping
// ---------------------------

pub fn reflection_to_record(reflection: &DailyReflection) -> Record {
    let mut record = Record::new();
    record.insert("id".into(), json!(reflection.id.to_string()));
    record.insert("date".into(), json!(day_to_epoch(reflection.date)));
    record.insert("rating".into(), json!(reflection.rating.as_str()));
    record.insert("tasksCompleted".into(), json!(reflection.tasks_completed));
    record.insert("totalTasks".into(), json!(reflection.total_tasks));
    record
}

pub fn reflection_from_record(record: &Record) -> Option<DailyReflection> {
    let id = Uuid::parse_str(record.get("id")?.as_str()?).ok()?;
    let date = epoch_to_day(record.get("date")?.as_i64()?)?;
    let rating = record.get("rating")?.as_str()?.parse().ok()?;
    let completed = u32::try_from(record.get("tasksCompleted")?.as_u64()?).ok()?;
    let total = u32::try_from(record.get("totalTasks")?.as_u64()?).ok()?;
    DailyReflection::with_id(id, date, rating, completed, total).ok()
}

fn record_id(record: &Record) -> AppResult<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::Sync("record has no id".into()))
}

// ---------------------------
// Databases
// ---------------------------

/// Stores each record as `<root>/<RecordType>/<id>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryCloud {
    root: PathBuf,
}

impl DirectoryCloud {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryCloud {
        DirectoryCloud { root: root.into() }
    }

    fn kind_dir(&self, kind: RecordType) -> PathBuf {
        self.root.join(kind.name())
    }
}

impl CloudDatabase for DirectoryCloud {
    fn save(&mut self, kind: RecordType, record: Record) -> AppResult<()> {
        let id = record_id(&record)?;
        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir)?;
        let s = serde_json::to_string_pretty(&record).map_err(|e| AppError::Sync(e.to_string()))?;
        fs::write(dir.join(format!("{}.json", id)), s)?;
        Ok(())
    }

    fn fetch_all(&self, kind: RecordType) -> AppResult<Vec<Record>> {
        let dir = self.kind_dir(kind);
        if !self.root.exists() {
            return Err(AppError::Sync(format!("sync folder {} is not reachable", self.root.display())));
        }
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path).map(|s| serde_json::from_str::<Record>(&s)) {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(e)) => warn!("skipping malformed record {}: {}", path.display(), e),
                Err(e) => warn!("skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    fn delete(&mut self, kind: RecordType, id: &str) -> AppResult<()> {
        let path = self.kind_dir(kind).join(format!("{}.json", id));
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-process database, handy for previews and tests. Can be switched
/// offline to exercise the local fallback.
#[derive(Debug, Clone, Default)]
pub struct MemoryCloud {
    records: HashMap<(RecordType, String), Record>,
    offline: bool,
}

impl MemoryCloud {
    pub fn new() -> MemoryCloud {
        MemoryCloud::default()
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline {
            return Err(AppError::Sync("database is offline".into()));
        }
        Ok(())
    }
}

impl CloudDatabase for MemoryCloud {
    fn save(&mut self, kind: RecordType, record: Record) -> AppResult<()> {
        self.check_online()?;
        let id = record_id(&record)?;
        self.records.insert((kind, id), record);
        Ok(())
    }

    fn fetch_all(&self, kind: RecordType) -> AppResult<Vec<Record>> {
        self.check_online()?;
        Ok(self
            .records
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn delete(&mut self, kind: RecordType, id: &str) -> AppResult<()> {
        self.check_online()?;
        self.records.remove(&(kind, id.to_string()));
        Ok(())
    }
}

// ---------------------------
// Repository
// ---------------------------

/// Local store plus an optional mirror.
pub struct Repository {
    local: Store,
    cloud: Option<Box<dyn CloudDatabase>>,
}

impl Repository {
    pub fn new(local: Store, cloud: Option<Box<dyn CloudDatabase>>) -> Repository {
        Repository { local, cloud }
    }

    pub fn local_only(local: Store) -> Repository {
        Repository::new(local, None)
    }

    /// Mirrors to `config.sync_dir` when one is configured.
    pub fn from_config(local: Store, config: &Config) -> Repository {
        let cloud = config
            .sync_dir
            .as_ref()
            .map(|dir| Box::new(DirectoryCloud::new(dir)) as Box<dyn CloudDatabase>);
        Repository::new(local, cloud)
    }

    pub fn store(&self) -> &Store {
        &self.local
    }

    /// Loads tasks and reflections.
    ///
    /// Local load failures are returned. Mirrored records are merged in by
    /// id (tasks: latest modification wins) or by day (reflections: the
    /// mirror wins); an unreachable mirror is logged and skipped.
    pub fn load_state(&self) -> AppResult<AppState> {
        let mut tasks = self.local.load_tasks()?;
        let mut reflections = self.local.load_reflections()?;

        if let Some(cloud) = &self.cloud {
            match cloud.fetch_all(RecordType::Task) {
                Ok(records) => merge_tasks(&mut tasks, records.iter().filter_map(parse_task)),
                Err(e) => warn!("Failed to fetch tasks, using local copy: {}", e),
            }
            match cloud.fetch_all(RecordType::DailyReflection) {
                Ok(records) => merge_reflections(&mut reflections, records.iter().filter_map(parse_reflection)),
                Err(e) => warn!("Failed to fetch reflections, using local copy: {}", e),
            }
        }
        tasks.sort_by_key(|t| t.id);
        Ok(AppState::new(tasks, reflections))
    }

    /// Like [`Repository::load_state`], but degrades to an empty state.
    pub fn load_state_or_empty(&self) -> AppState {
        self.load_state().unwrap_or_else(|e| {
            warn!("{}", e);
            AppState::default()
        })
    }

    /// Writes the changed documents locally and mirrors the touched records.
    pub fn persist(&mut self, state: &AppState, outcome: &Outcome) -> AppResult<()> {
        let tasks_changed = !(outcome.created.is_empty() && outcome.updated.is_empty() && outcome.removed.is_empty());
        if tasks_changed {
            self.local.save_tasks(&state.tasks)?;
        }
        if outcome.reflection.is_some() {
            self.local.save_reflections(&state.reflections)?;
        }

        let Some(cloud) = self.cloud.as_mut() else {
            return Ok(());
        };
        for id in outcome.created.iter().chain(&outcome.updated) {
            if let Some(task) = state.tasks.iter().find(|t| t.id == *id) {
                if let Err(e) = cloud.save(RecordType::Task, task_to_record(task)) {
                    warn!("Failed to mirror task {}: {}", id, e);
                }
            }
        }
        for uuid in &outcome.removed {
            if let Err(e) = cloud.delete(RecordType::Task, &uuid.to_string()) {
                warn!("Failed to delete mirrored task {}: {}", uuid, e);
            }
        }
        if let Some(id) = outcome.reflection {
            if let Some(r) = state.reflections.iter().find(|r| r.id == id) {
                // A replaced reflection may have lived under another id.
                match cloud.fetch_all(RecordType::DailyReflection) {
                    Ok(records) => {
                        for stale in records.iter().filter_map(parse_reflection).filter(|s| s.date == r.date && s.id != r.id) {
                            if let Err(e) = cloud.delete(RecordType::DailyReflection, &stale.id.to_string()) {
                                warn!("Failed to delete replaced reflection {}: {}", stale.id, e);
                            }
                        }
                    }
                    Err(e) => warn!("Failed to look up mirrored reflections for {}: {}", r.date, e),
                }
                if let Err(e) = cloud.save(RecordType::DailyReflection, reflection_to_record(r)) {
                    warn!("Failed to mirror reflection for {}: {}", r.date, e);
                }
            }
        }
        Ok(())
    }

    /// Deletes every task and reflection, mirrored records first.
    ///
    /// If the mirror cannot be listed nothing local is touched, so a reset
    /// never reports success while records would come back on the next load.
    /// Returns how many mirrored records were deleted.
    pub fn clear(&mut self) -> AppResult<usize> {
        let mut count = 0;
        if let Some(cloud) = self.cloud.as_mut() {
            for kind in [RecordType::Task, RecordType::DailyReflection] {
                for record in cloud.fetch_all(kind)? {
                    cloud.delete(kind, &record_id(&record)?)?;
                    count += 1;
                }
            }
        }
        self.local.delete_all()?;
        debug!("cleared local store and {} mirrored record(s)", count);
        Ok(count)
    }

    /// Uploads every record. Returns how many were mirrored.
    pub fn push_all(&mut self, state: &AppState) -> AppResult<usize> {
        let cloud = self
            .cloud
            .as_mut()
            .ok_or_else(|| AppError::Sync("no sync folder configured".into()))?;
        let mut count = 0;
        for task in &state.tasks {
            cloud.save(RecordType::Task, task_to_record(task))?;
            count += 1;
        }
        for r in &state.reflections {
            cloud.save(RecordType::DailyReflection, reflection_to_record(r))?;
            count += 1;
        }
        debug!("pushed {} record(s)", count);
        Ok(count)
    }
}

fn parse_task(record: &Record) -> Option<Task> {
    let task = task_from_record(record);
    if task.is_none() {
        warn!("skipping malformed task record {:?}", record.get("id"));
    }
    task
}

fn parse_reflection(record: &Record) -> Option<DailyReflection> {
    let reflection = reflection_from_record(record);
    if reflection.is_none() {
        warn!("skipping malformed reflection record {:?}", record.get("id"));
    }
    reflection
}

/// Merges mirrored tasks by `uuid`. The local short id is kept for known
/// tasks; a new task whose short id is taken (or missing) gets a free one.
fn merge_tasks(local: &mut Vec<Task>, remote: impl Iterator<Item = Task>) {
    for mut task in remote {
        match local.iter_mut().find(|t| t.uuid == task.uuid) {
            Some(existing) => {
                if task.modified_at > existing.modified_at {
                    task.id = existing.id;
                    *existing = task;
                }
            }
            None => {
                if task.id == 0 || local.iter().any(|t| t.id == task.id) {
                    task.id = next_task_id(local);
                }
                local.push(task);
            }
        }
    }
}

fn merge_reflections(local: &mut Vec<DailyReflection>, remote: impl Iterator<Item = DailyReflection>) {
    for reflection in remote {
        local.retain(|r| r.date != reflection.date);
        local.push(reflection);
    }
}
