//! Persisting extraction results.
//!
//! Backends implement [`Storage`]. [`FileStorage`] writes a directory of
//! plain files; [`SqliteStorage`] appends rows to a SQLite database, which
//! [`SqliteStore`] can query afterwards.
mod file;
mod sqlite;

pub use file::FileStorage;
pub use sqlite::{DocumentSummary, SCHEMA_VERSION, SqliteStorage, SqliteStore, StoredDocument};

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ExtractionResult;

/// A storage backend.
pub trait Storage {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Persist `data` at `destination`: a directory or a database file,
    /// created when missing.
    fn save(&self, data: &ExtractionResult, destination: &Path) -> Result<()>;
}

/// Backends selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    File,
    Sqlite,
}

impl BackendKind {
    /// A boxed backend of this kind.
    pub fn backend(self) -> Box<dyn Storage> {
        match self {
            BackendKind::File => Box::new(FileStorage),
            BackendKind::Sqlite => Box::new(SqliteStorage),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::File => "file",
            BackendKind::Sqlite => "sqlite",
        })
    }
}
