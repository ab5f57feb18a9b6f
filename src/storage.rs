use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::errors::StorageError;
use crate::models::{DailyReflection, Task};

/// Key under which the task list is stored.
pub const TASKS_KEY: &str = "tasks";
/// Key under which the reflection history is stored.
pub const REFLECTIONS_KEY: &str = "reflections";

/// Returns the directory holding the data files.
///
/// The path is determined in the following order:
/// 1. `BETTERDAY_DATA_DIR` environment variable.
/// 2. `~/.local/share/betterday` (on Linux).
/// 3. `./` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var("BETTERDAY_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("betterday");
        p
    })
}

/// Local key-value store: one pretty-printed JSON document per key.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Store {
        Store { root: root.into() }
    }

    /// Opens the store in [`data_dir`].
    pub fn open_default() -> Store {
        Store::new(data_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Reads the list stored under `key`. A missing key is an empty list.
    fn load<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>, StorageError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let load_failed = |reason: String| StorageError::LoadFailed { key, reason };
        let mut f = OpenOptions::new().read(true).open(&path).map_err(|e| load_failed(e.to_string()))?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(|e| load_failed(e.to_string()))?;
        serde_json::from_str(&s).map_err(|e| load_failed(e.to_string()))
    }

    /// Overwrites the list stored under `key`.
    fn save<T: Serialize>(&self, key: &'static str, items: &[T]) -> Result<(), StorageError> {
        let save_failed = |reason: String| StorageError::SaveFailed { key, reason };
        let s = serde_json::to_string_pretty(items).map_err(|e| save_failed(e.to_string()))?;
        fs::create_dir_all(&self.root).map_err(|e| save_failed(e.to_string()))?;
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.key_path(key))
            .map_err(|e| save_failed(e.to_string()))?;
        f.write_all(s.as_bytes()).map_err(|e| save_failed(e.to_string()))?;
        debug!("saved {} record(s) under '{}'", items.len(), key);
        Ok(())
    }

    /// Loads all tasks.
    pub fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        self.load(TASKS_KEY)
    }

    /// Saves the given list of tasks, replacing the stored one.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        self.save(TASKS_KEY, tasks)
    }

    /// Loads all reflections.
    pub fn load_reflections(&self) -> Result<Vec<DailyReflection>, StorageError> {
        self.load(REFLECTIONS_KEY)
    }

    pub fn save_reflections(&self, reflections: &[DailyReflection]) -> Result<(), StorageError> {
        self.save(REFLECTIONS_KEY, reflections)
    }

    /// Saves a reflection, replacing any stored for the same day.
    pub fn save_reflection(&self, reflection: &DailyReflection) -> Result<(), StorageError> {
        let mut reflections = self.load_reflections()?;
        reflections.retain(|r| r.date != reflection.date);
        reflections.push(reflection.clone());
        self.save_reflections(&reflections)
    }

    /// Loads the reflection recorded for `date`, if any.
    pub fn load_reflection(&self, date: NaiveDate) -> Result<Option<DailyReflection>, StorageError> {
        Ok(self.load_reflections()?.into_iter().find(|r| r.date == date))
    }

    /// Deletes the task and reflection documents.
    pub fn delete_all(&self) -> std::io::Result<()> {
        for key in [TASKS_KEY, REFLECTIONS_KEY] {
            let path = self.key_path(key);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
