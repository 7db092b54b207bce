//! Binary-level error type.
//!
//! Wraps engine errors together with the failures only the binary can hit:
//! file access, configuration and dataset parsing.

use competency_core::{CompetencyError, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// An engine operation failed.
    #[error(transparent)]
    Core(#[from] CompetencyError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::Config`].
    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration parsed but holds unusable values.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid dataset: {0}")]
    DatasetParse(#[from] serde_json::Error),

    /// The dataset parsed but references something that does not exist.
    #[error("Invalid dataset: {0}")]
    Dataset(String),

    /// A command argument could not be interpreted.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    ///
    /// Engine errors get one code per family so scripts can tell a missing
    /// record from a rejected input.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(e) => match e.kind() {
                ErrorKind::NotFound => 3,
                ErrorKind::Validation => 4,
                ErrorKind::InvalidStateTransition => 5,
                ErrorKind::DuplicateKey => 6,
                ErrorKind::Serialization => 7,
            },
            Self::Io { .. } => 10,
            Self::ConfigParse { .. } | Self::Config(_) => 11,
            Self::DatasetParse(_) | Self::Dataset(_) => 12,
            Self::Argument(_) => 2,
        }
    }
}
