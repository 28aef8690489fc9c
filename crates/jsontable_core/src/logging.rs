//! Process logging bootstrap for embedding applications.
//!
//! # Responsibility
//! - Start rolling file logs for store diagnostics once per process.
//! - Route panics through the same log before the default hook runs.
//!
//! # Invariants
//! - Logs carry metadata only (`event=... table=... id=...`), never record
//!   payloads.
//! - Repeating `init_logging` with the same settings is a no-op; different
//!   settings are refused.
//! - Nothing in this module panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "jsontable";
const ROTATE_AT_BYTES: u64 = 4 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 3;
const PANIC_SUMMARY_CHARS: usize = 120;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: log::LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDir(PathBuf),
    CreateDir { dir: PathBuf, message: String },
    Backend(String),
    AlreadyActive {
        level: log::LevelFilter,
        dir: PathBuf,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDir { dir, message } => {
                write!(f, "cannot create log directory `{}`: {message}", dir.display())
            }
            Self::Backend(message) => write!(f, "logger backend failed: {message}"),
            Self::AlreadyActive { level, dir } => write!(
                f,
                "logging already active at level `{level}` in `{}`",
                dir.display()
            ),
        }
    }
}

impl Error for LoggingError {}

/// Starts file logging at `level` into `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `RelativeDir` for bad arguments.
/// - `AlreadyActive` when logging runs with other settings.
/// - `CreateDir` / `Backend` when the logger cannot start.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let dir = log_dir.as_ref().to_path_buf();
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir));
    }

    let active = ACTIVE.get_or_try_init(|| start_logger(level, &dir))?;
    if active.level != level || active.dir != dir {
        return Err(LoggingError::AlreadyActive {
            level: active.level,
            dir: active.dir.clone(),
        });
    }
    Ok(())
}

/// Level and directory of the running logger, if any.
pub fn logging_status() -> Option<(log::LevelFilter, PathBuf)> {
    ACTIVE.get().map(|active| (active.level, active.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: log::LevelFilter, dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|err| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let handle = Logger::try_with_str(level.to_string())
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_start module=logging status=ok level={} dir={} version={}",
        level,
        dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<log::LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(log::LevelFilter::Trace),
        "debug" => Ok(log::LevelFilter::Debug),
        "info" => Ok(log::LevelFilter::Info),
        "warn" | "warning" => Ok(log::LevelFilter::Warn),
        "error" => Ok(log::LevelFilter::Error),
        _ => Err(LoggingError::UnknownLevel(level.to_string())),
    }
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
