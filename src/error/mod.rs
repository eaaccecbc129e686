pub mod codes;

use crate::packages::fetch::FetchError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported package source: {0}")]
    UnrecognizedSource(String),

    #[error("Failed to load {}: {message}", path.display())]
    ManifestLoad { path: PathBuf, message: String },

    #[error("{} already exists. Use --force to overwrite.", path.display())]
    AlreadyInitialized { path: PathBuf },

    #[error("Failed to create cache directory {}: {source}", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install {name}: {source}")]
    Resolution {
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("Installation cancelled while resolving {name}")]
    Cancelled { name: String },

    #[error("Failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a manifest or lockfile that could not be read or parsed.
    pub fn manifest_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
