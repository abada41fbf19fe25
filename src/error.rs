//! Error types for the wardrobe store and scoring engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Storage could not be opened or created at all. The app cannot proceed.
    #[error("Failed to initialize database at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The database location could not be prepared (parent directory or
    /// first-run catalog copy). Fatal, like [`Error::Init`].
    #[error("Failed to prepare database location {path}: {source}")]
    InitIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single read or write failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected before reaching storage
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// True for errors the caller cannot recover from by retrying later
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Init { .. } | Error::InitIo { .. })
    }
}
