//! Line-oriented logging
//!
//! Every log record becomes a single `LEVEL: message` line on stdout. The
//! label is colorized when enabled. When a log file is configured the same
//! line, without colors, is appended there as well.
//!
//! The dispatcher is installed once by the entry point; the returned
//! [`LoggingGuard`] flushes and silences it when dropped.

use std::io;
use std::path::PathBuf;

use log::{Level, LevelFilter, SetLoggerError};
use thiserror::Error;

use crate::color::{self, format_color};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install logger: {0}")]
    Install(#[from] SetLoggerError),
}

/// Settings for [`install`]
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub use_color: bool,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl LogSettings {
    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Label printed in front of each line
fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => color::COLOR_RED_BG,
        Level::Warn => color::COLOR_YELLOW_BG,
        Level::Info => color::COLOR_GREEN_BG,
        Level::Debug | Level::Trace => color::COLOR_CYAN_BG,
    }
}

/// Renders the `LEVEL:` prefix of a line
pub fn render_label(level: Level, use_color: bool) -> String {
    format_color(
        &format!("{}:", level_label(level)),
        level_color(level),
        use_color,
    )
}

/// Builds the stdout and log file chains without installing them
pub fn dispatch(settings: &LogSettings) -> Result<fern::Dispatch, LoggingError> {
    let use_color = settings.use_color;
    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {}",
                render_label(record.level(), use_color),
                message
            ))
        })
        .chain(io::stdout());

    let mut root = fern::Dispatch::new().level(settings.level()).chain(console);

    if let Some(path) = &settings.log_file {
        let file = fern::log_file(path).map_err(|source| LoggingError::LogFile {
            path: path.clone(),
            source,
        })?;
        root = root.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} {}",
                        render_label(record.level(), false),
                        message
                    ))
                })
                .chain(file),
        );
    }

    Ok(root)
}

/// Keeps the logger active; logging is switched off when dropped
#[must_use = "logging stops when the guard is dropped"]
pub struct LoggingGuard {
    _private: (),
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        log::logger().flush();
        log::set_max_level(LevelFilter::Off);
    }
}

/// Installs the process-wide logger
pub fn install(settings: &LogSettings) -> Result<LoggingGuard, LoggingError> {
    dispatch(settings)?.apply()?;
    Ok(LoggingGuard { _private: () })
}
