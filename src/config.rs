use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use log::warn;
use crate::boundary::DEFAULT_CUTOFF_HOUR;

/// Name of the optional configuration file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder records are mirrored to, e.g. one kept in sync by a file-sync service.
    pub sync_dir: Option<PathBuf>,
    /// Hour of the next morning at which a day's reflection closes.
    pub reflection_cutoff_hour: u32,
    /// `log` level filter: off, error, warn, info, debug or trace.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_dir: None,
            reflection_cutoff_hour: DEFAULT_CUTOFF_HOUR,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Loads `config.json` from `data_dir` and applies environment overrides.
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            match fs::read_to_string(&path).map(|s| serde_json::from_str::<Config>(&s)) {
                Ok(Ok(c)) => c,
                Ok(Err(e)) => {
                    warn!("ignoring malformed {}: {}", path.display(), e);
                    Config::default()
                }
                Err(e) => {
                    warn!("cannot read {}: {}", path.display(), e);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        if let Ok(dir) = env::var("BETTERDAY_SYNC_DIR") {
            config.sync_dir = if dir.is_empty() { None } else { Some(PathBuf::from(dir)) };
        }
        if let Ok(level) = env::var("BETTERDAY_LOG") {
            config.log_level = level;
        }
        config.reflection_cutoff_hour = config.reflection_cutoff_hour.min(23);
        config
    }
}
