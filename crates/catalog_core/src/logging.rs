//! Rolling file logs for catalog processes.
//!
//! # Responsibility
//! - Turn the `log_level` / `log_dir` pair of a [`CatalogConfig`] into one
//!   process-wide file logger.
//! - Keep query events on one line as `key=value` pairs.
//!
//! # Invariants
//! - The first successful init fixes level and directory for the process.
//! - Re-initializing with the same target is a no-op; any other target is a
//!   [`LoggingError::Conflict`].

use crate::config::CatalogConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "catalog";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

pub type LoggingResult<T> = Result<T, LoggingError>;

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    RelativeDir(PathBuf),
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(FlexiLoggerError),
    Conflict { active: LogTarget, requested: LogTarget },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected off|error|warn|info|debug|trace"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already writes `{}` at `{}`; refusing `{}` at `{}`",
                active.level,
                active.dir.display(),
                requested.level,
                requested.dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::InvalidLevel(_) | Self::RelativeDir(_) | Self::Conflict { .. } => None,
        }
    }
}

/// Where and how verbosely the catalog logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

impl LogTarget {
    /// # Errors
    /// - [`LoggingError::InvalidLevel`] for anything `LevelFilter` cannot parse.
    /// - [`LoggingError::RelativeDir`] unless `dir` is absolute.
    pub fn new(level: &str, dir: impl Into<PathBuf>) -> LoggingResult<Self> {
        let dir = dir.into();
        if !dir.is_absolute() {
            return Err(LoggingError::RelativeDir(dir));
        }
        Ok(Self {
            level: parse_level(level)?,
            dir,
        })
    }

    /// `None` when the config leaves `log_dir` unset.
    pub fn from_config(config: &CatalogConfig) -> LoggingResult<Option<Self>> {
        let Some(dir) = config.log_dir.as_deref() else {
            return Ok(None);
        };
        let level = match config.log_level.as_deref() {
            Some(value) => parse_level(value)?,
            None => default_log_level(),
        };
        if !dir.is_absolute() {
            return Err(LoggingError::RelativeDir(dir.to_path_buf()));
        }
        Ok(Some(Self {
            level,
            dir: dir.to_path_buf(),
        }))
    }
}

pub(crate) fn parse_level(value: &str) -> LoggingResult<LevelFilter> {
    LevelFilter::from_str(value.trim())
        .map_err(|_| LoggingError::InvalidLevel(value.trim().to_string()))
}

/// `Debug` in debug builds, `Info` otherwise.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Starts the file logger for `target`, or confirms it is already running.
pub fn init_logging(target: &LogTarget) -> LoggingResult<()> {
    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(target))?;
    if active.target != *target {
        return Err(LoggingError::Conflict {
            active: active.target.clone(),
            requested: target.clone(),
        });
    }
    Ok(())
}

/// Initializes logging from config; returns `false` when no `log_dir` is set.
pub fn init_logging_with_config(config: &CatalogConfig) -> LoggingResult<bool> {
    match LogTarget::from_config(config)? {
        Some(target) => init_logging(&target).map(|()| true),
        None => Ok(false),
    }
}

pub fn active_log_target() -> Option<&'static LogTarget> {
    ACTIVE_LOGGER.get().map(|active| &active.target)
}

fn start_logger(target: &LogTarget) -> LoggingResult<ActiveLogger> {
    std::fs::create_dir_all(&target.dir).map_err(|source| LoggingError::CreateDir {
        dir: target.dir.clone(),
        source,
    })?;

    let spec = LogSpecification::builder().default(target.level).build();
    let handle = Logger::with(spec)
        .log_to_file(file_spec(&target.dir))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    info!(
        "event=logging_init module=logging status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        target.level,
        target.dir.display()
    );

    Ok(ActiveLogger {
        target: target.clone(),
        _handle: handle,
    })
}

fn file_spec(dir: &Path) -> FileSpec {
    FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME)
}

#[cfg(test)]
mod tests {
    use super::{
        active_log_target, init_logging, init_logging_with_config, parse_level, LogTarget,
        LoggingError,
    };
    use crate::config::CatalogConfig;
    use log::LevelFilter;
    use std::path::PathBuf;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::Off);
        assert!(matches!(
            parse_level("verbose"),
            Err(LoggingError::InvalidLevel(value)) if value == "verbose"
        ));
    }

    #[test]
    fn target_requires_absolute_dir() {
        assert!(matches!(
            LogTarget::new("info", "logs/catalog"),
            Err(LoggingError::RelativeDir(_))
        ));
    }

    #[test]
    fn config_without_log_dir_leaves_logging_alone() {
        let config = CatalogConfig {
            log_level: Some("trace".to_string()),
            ..CatalogConfig::default()
        };
        assert_eq!(LogTarget::from_config(&config).unwrap(), None);
    }

    #[test]
    fn config_target_drives_init_and_conflicts_are_rejected() {
        let log_dir = tempfile::tempdir().unwrap();
        let other_dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig {
            log_level: Some("info".to_string()),
            log_dir: Some(log_dir.path().to_path_buf()),
            ..CatalogConfig::default()
        };

        assert!(init_logging_with_config(&config).unwrap());
        assert!(init_logging_with_config(&config).unwrap());

        let louder = LogTarget::new("trace", log_dir.path()).unwrap();
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::Conflict { .. })
        ));

        let elsewhere = LogTarget::new("info", other_dir.path()).unwrap();
        let err = init_logging(&elsewhere).unwrap_err();
        assert!(err.to_string().contains("refusing"));

        let active = active_log_target().unwrap();
        assert_eq!(active.level, LevelFilter::Info);
        assert_eq!(active.dir, PathBuf::from(log_dir.path()));
    }
}
