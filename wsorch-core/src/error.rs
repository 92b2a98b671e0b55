//! Error types and result aliases.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot read manifest {path}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("Error executing '{command}' in '{path}': {message}")]
    CommandExecution {
        command: String,
        path: PathBuf,
        message: String,
    },

    #[error("Command '{command}' in '{path}' timed out after {timeout:?}")]
    CommandTimeout {
        command: String,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("{failed} of {total} tasks failed; first failure: {first}")]
    Scheduler {
        failed: usize,
        total: usize,
        #[source]
        first: Box<Error>,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "wsorch.toml".to_string(),
        }
    }
}

impl Error {
    /// Returns the innermost error, unwrapping scheduler aggregates.
    pub fn root(&self) -> &Error {
        match self {
            Error::Scheduler { first, .. } => first.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
