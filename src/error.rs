//! Unified error types for docsift.
//!
//! Format parsers keep their own error enums ([`crate::ooxml::OoxmlError`],
//! [`crate::ole::ppt::PptError`], [`crate::pdf::PdfError`]). They are folded
//! into [`Error`] at the loader and extractor boundaries so that callers see
//! which stage failed: open, extract, or store.
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Boxed source error carried by [`Error::Extraction`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for docsift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The file extension has no loader, or does not match the loader used.
    #[error("Unsupported format '{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The source file does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The parsing engine could not open the file.
    #[error("Corrupted file {}: {reason}", path.display())]
    CorruptFile { path: PathBuf, reason: String },

    /// An extraction pass failed on an otherwise open document.
    #[error("Failed to extract {operation}: {source}")]
    Extraction {
        operation: Operation,
        #[source]
        source: BoxError,
    },

    /// Writing to a storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for docsift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// The database file is locked by another writer.
    #[error("Database is locked: {}", .0.display())]
    Locked(PathBuf),

    /// The database was written by a newer schema than this build knows.
    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Sqlite(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(StorageError::Io(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Sqlite(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Storage(StorageError::Csv(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(StorageError::Json(err))
    }
}

/// The four extraction passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Text,
    Links,
    Images,
    Tables,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Text => "text",
            Operation::Links => "links",
            Operation::Images => "images",
            Operation::Tables => "tables",
        })
    }
}

/// Processing stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Extract,
    Store,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Open => "open",
            Stage::Extract => "extract",
            Stage::Store => "store",
            Stage::Config => "config",
        })
    }
}

impl Error {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Error::UnsupportedFormat { .. } | Error::FileNotFound(_) | Error::CorruptFile { .. } => {
                Stage::Open
            },
            Error::Extraction { .. } => Stage::Extract,
            Error::Storage(_) => Stage::Store,
            Error::Config(_) => Stage::Config,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl fmt::Display) -> Self {
        Error::CorruptFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction<E>(operation: Operation, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Extraction {
            operation,
            source: source.into(),
        }
    }
}
