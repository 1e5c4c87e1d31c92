use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Path {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot scan system directory: {}", .0.display())]
    Restricted(PathBuf),

    #[error("volume at {} reports zero capacity", .0.display())]
    EmptyVolume(PathBuf),

    #[error("{provider} unavailable: {details}")]
    ProviderUnavailable {
        provider: &'static str,
        details: String,
    },

    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AtlasError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unavailable(provider: &'static str, details: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider,
            details: details.into(),
        }
    }
}
