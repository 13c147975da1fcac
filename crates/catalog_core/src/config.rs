//! Catalog configuration.
//!
//! # Responsibility
//! - Deserialize the list of store locators and transport settings.
//! - Validate every locator before any processor is constructed.
//!
//! # Invariants
//! - A config that parses always has a positive HTTP timeout.
//! - Locator order in `stores` is the processor registration order.

use crate::backend::StoreError;
use crate::locator::{LocatorError, StoreLocator};
use crate::logging::{parse_level, LogTarget, LoggingError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors raised before the engine starts.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    InvalidLocator { index: usize, source: LocatorError },
    InvalidTimeout,
    Transport(StoreError),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read catalog config: {err}"),
            Self::Parse(err) => write!(f, "invalid catalog config: {err}"),
            Self::InvalidLocator { index, source } => {
                write!(f, "stores[{index}] is not a usable locator: {source}")
            }
            Self::InvalidTimeout => write!(f, "http_timeout_ms must be greater than zero"),
            Self::Transport(err) => write!(f, "failed to prepare sparql transport: {err}"),
            Self::Logging(err) => write!(f, "invalid logging settings: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::InvalidLocator { source, .. } => Some(source),
            Self::InvalidTimeout => None,
            Self::Transport(err) => Some(err),
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Catalog configuration document.
///
/// ```json
/// {
///   "stores": ["relational.db", "http://127.0.0.1:9999/blazegraph/sparql"],
///   "http_timeout_ms": 10000,
///   "log_level": "info",
///   "log_dir": "/var/log/catalog"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Locator strings, one per backend, in registration order.
    pub stores: Vec<String>,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling logs; unset leaves logging to the host.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            log_level: None,
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    pub fn from_json_str(value: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Parses every locator, failing on the first invalid entry.
    pub fn locators(&self) -> ConfigResult<Vec<StoreLocator>> {
        self.stores
            .iter()
            .enumerate()
            .map(|(index, value)| {
                StoreLocator::parse(value)
                    .map_err(|source| ConfigError::InvalidLocator { index, source })
            })
            .collect()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if let Some(level) = self.log_level.as_deref() {
            parse_level(level)?;
        }
        LogTarget::from_config(self)?;
        self.locators().map(|_| ())
    }
}
