//! # Configuration
//!
//! Layered settings for the binary. Precedence, highest first:
//!
//! 1. CLI flags
//! 2. Environment (`COMPETENCY_DATA`, `COMPETENCY_LOG_FORMAT`)
//! 3. TOML file (`--config`, or `competency.toml` in the working directory)
//! 4. Built-in defaults
//!
//! ```toml
//! [assessment]
//! passing_threshold = 70
//! validity_days = 365
//!
//! [logging]
//! format = "json"
//!
//! [data]
//! path = "competency.json"
//! ```

use crate::error::AppError;
use competency_core::primitives::{ASSESSMENT_VALIDITY_DAYS, DEFAULT_PASSING_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "competency.toml";

/// Data file used when nothing else names one.
pub const DEFAULT_DATA_FILE: &str = "competency.json";

pub const ENV_DATA: &str = "COMPETENCY_DATA";
pub const ENV_LOG_FORMAT: &str = "COMPETENCY_LOG_FORMAT";

/// Config files above this size are rejected unread.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse an environment value. Unknown values fall back to `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssessmentConfig {
    /// Minimum whole percentage for a passing score.
    pub passing_threshold: u8,
    /// Days an assessment stays current.
    pub validity_days: i64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            passing_threshold: DEFAULT_PASSING_THRESHOLD,
            validity_days: ASSESSMENT_VALIDITY_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub assessment: AssessmentConfig,
    pub logging: LoggingConfig,
    pub data: DataConfig,
}

impl Config {
    /// Load the file layer.
    ///
    /// An explicit path must exist. Without one, `competency.toml` is read
    /// from the working directory if present, otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let metadata = std::fs::metadata(path).map_err(|e| AppError::io(path, e))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(AppError::Config(format!(
                "{} is {} bytes, maximum is {}",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let config = Self::parse(&text, path)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text; `origin` only labels errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, AppError> {
        let config: Self = toml::from_str(text).map_err(|source| AppError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no command can work with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.assessment.passing_threshold > 100 {
            return Err(AppError::Config(format!(
                "assessment.passing_threshold must be at most 100, got {}",
                self.assessment.passing_threshold
            )));
        }
        if self.assessment.validity_days <= 0 {
            return Err(AppError::Config(format!(
                "assessment.validity_days must be positive, got {}",
                self.assessment.validity_days
            )));
        }
        Ok(())
    }

    /// Apply the environment layer. Values are passed in so callers and
    /// tests decide where they come from.
    #[must_use]
    pub fn with_env(mut self, data: Option<String>, log_format: Option<String>) -> Self {
        if let Some(data) = data.filter(|d| !d.trim().is_empty()) {
            self.data.path = Some(PathBuf::from(data));
        }
        if let Some(format) = log_format.as_deref().and_then(LogFormat::from_name) {
            self.logging.format = format;
        }
        self
    }

    /// [`Config::with_env`] fed from the process environment.
    #[must_use]
    pub fn with_process_env(self) -> Self {
        self.with_env(
            std::env::var(ENV_DATA).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }

    /// Apply the CLI layer.
    #[must_use]
    pub fn with_cli(mut self, data: Option<PathBuf>) -> Self {
        if data.is_some() {
            self.data.path = data;
        }
        self
    }

    /// The data file every command reads.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.data
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
    }
}
