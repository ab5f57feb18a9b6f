use flexi_logger::{Logger, LoggerHandle};
use crate::errors::AppResult;

/// Starts the stderr logger. `BETTERDAY_LOG`/`RUST_LOG` style specs such as
/// `debug` or `betterday::storage=trace` are accepted.
///
/// The returned handle must be kept alive for as long as logging is needed.
pub fn init_logging(level: &str) -> AppResult<LoggerHandle> {
    let spec = if level.trim().is_empty() { "warn" } else { level };
    let handle = Logger::try_with_str(spec)?.log_to_stderr().start()?;
    Ok(handle)
}
