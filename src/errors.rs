//! Crate-wide error type.
//! Library modules return `AppResult`; the CLI prints the error and exits
//! non-zero, the TUI swallows it and keeps the previous view.

use chrono::NaiveDate;
use std::io;
use thiserror::Error;

/// Failures of the local key-value store.
///
/// Only two kinds exist; the key names the document that failed.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to save '{key}': {reason}")]
    SaveFailed { key: &'static str, reason: String },

    #[error("Failed to load '{key}': {reason}")]
    LoadFailed { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO / persistence
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Sync error: {0}")]
    Sync(String),

    // ---------------------------
    // Input parsing
    // ---------------------------
    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid month '{0}'. Use YYYY-MM.")]
    InvalidMonth(String),

    #[error("Invalid weekday '{0}'. Use mon, tue, wed, thu, fri, sat, sun.")]
    InvalidWeekday(String),

    #[error("Invalid rating '{0}'. Use better, same or worse.")]
    InvalidRating(String),

    // ---------------------------
    // Domain rules
    // ---------------------------
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Task {0} not found")]
    TaskNotFound(u64),

    #[error("Task {0} is not recurring")]
    NotRecurring(u64),

    #[error("Task {0} does not occur on {1}")]
    NotScheduled(u64, NaiveDate),

    #[error("Task {0} is already done on {1}")]
    AlreadyDone(u64, NaiveDate),

    #[error("A recurring task needs at least one weekday")]
    NoWeekdays,

    #[error("Reflection counts are inconsistent: {completed} completed of {total}")]
    InvalidReflection { completed: u32, total: u32 },

    #[error("Reflection for {0} is closed")]
    ReflectionClosed(NaiveDate),

    // ---------------------------
    // Setup
    // ---------------------------
    #[error("Logging error: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),
}

pub type AppResult<T> = Result<T, AppError>;
