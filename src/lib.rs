//! Library side of `betterday`: the task and reflection model, the
//! availability rules, derived statistics and persistence. The binary in
//! `main.rs` is a thin CLI/TUI over these modules.

pub mod boundary;
pub mod calendar;
pub mod commands;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod progress;
pub mod state;
pub mod storage;
pub mod sync;
pub mod tui;
