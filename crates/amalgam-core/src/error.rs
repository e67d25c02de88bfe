use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmalgamError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not valid UTF-8: {}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Root file not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Reference depth limit of {limit} exceeded while resolving '{name}'")]
    DepthExceeded { name: String, limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AmalgamError>;
