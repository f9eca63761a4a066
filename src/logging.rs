//! File logging. The terminal belongs to the UI, so log records go to a file.

use std::fs::{self, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

use crate::error::{AppError, Result};

/// Parse a level name ("off", "error", "warn", "info", "debug", "trace").
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Config(format!("unknown log level '{}'", level)))
}

/// Install the global file logger, appending to `file`.
pub fn init(level: LevelFilter, file: &Path) -> Result<()> {
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(file)?;
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Off)
        .build();
    WriteLogger::init(level, config, log_file).map_err(|e| AppError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_levels() {
        assert_eq!(parse_level("off").unwrap(), LevelFilter::Off);
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::Warn);
    }

    #[test]
    fn parse_unknown_level_is_config_error() {
        let err = parse_level("loud").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(err.to_string(), "Config error: unknown log level 'loud'");
    }
}
