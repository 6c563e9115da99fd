//! The contract shared by every persistence backend.

use std::{fmt, path::PathBuf};

use crate::domain::{Equipment, Snapshot, SnapshotRef, SupplyRequest};

/// Which kind of backend is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The embedded relational database. Writes through on every mutation.
    Database,
    /// A pair of fixed-width binary files. Buffers until the bulk save.
    FlatFile,
}

impl BackendKind {
    /// The human-readable data source name, as shown in reports.
    #[must_use]
    pub const fn data_source(self) -> &'static str {
        match self {
            Self::Database => "SQLite Database",
            Self::FlatFile => "Local Files",
        }
    }

    /// Short machine-friendly name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::FlatFile => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable storage for the inventory.
///
/// A write-through backend persists each row as it is inserted or updated and
/// treats [`Backend::save`] as a no-op. A buffering backend does the opposite.
/// Either way the store calls every method, and calls the row methods
/// *before* it changes anything in memory.
pub trait Backend: fmt::Debug {
    /// Which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Reads the full persisted state.
    ///
    /// # Errors
    ///
    /// Fails if the underlying storage cannot be read or holds records that
    /// cannot be decoded.
    fn load(&mut self) -> Result<Snapshot, BackendError>;

    /// Persists a new equipment record.
    ///
    /// A backend that assigns its own identifiers adopts the assigned
    /// identifier into `item` (resealing its checksum) before returning.
    ///
    /// # Errors
    ///
    /// Fails if the row cannot be written.
    fn insert_equipment(&mut self, item: &mut Equipment) -> Result<(), BackendError>;

    /// Persists a change to an existing equipment record.
    ///
    /// # Errors
    ///
    /// Fails if the row cannot be written or does not exist.
    fn update_equipment(&mut self, item: &Equipment) -> Result<(), BackendError>;

    /// Persists a new supply request, adopting any backend-assigned
    /// identifier.
    ///
    /// # Errors
    ///
    /// Fails if the row cannot be written.
    fn insert_request(&mut self, request: &mut SupplyRequest) -> Result<(), BackendError>;

    /// Persists a status change to an existing supply request.
    ///
    /// # Errors
    ///
    /// Fails if the row cannot be written or does not exist.
    fn update_request(&mut self, request: &SupplyRequest) -> Result<(), BackendError>;

    /// Records an audit entry alongside the data, if the backend keeps one.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be written.
    fn record_audit(&mut self, _message: &str) -> Result<(), BackendError> {
        Ok(())
    }

    /// Writes the full current state.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be written.
    fn save(&mut self, snapshot: SnapshotRef<'_>) -> Result<(), BackendError>;
}

/// A failure inside a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The database rejected a statement or could not be opened.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A local file could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A stored record could not be decoded.
    #[error("corrupt data in {location}: {reason}")]
    Corrupt {
        /// The file or table holding the record.
        location: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An update targeted a row that does not exist.
    #[error("no {table} row with id {id}")]
    MissingRow {
        /// The table being updated.
        table: &'static str,
        /// The identifier that matched nothing.
        id: u32,
    },

    /// The database connection settings are unusable.
    #[error(transparent)]
    Config(#[from] super::db_config::DbConfigError),
}

impl BackendError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(location: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this failure concerns the database rather than local files.
    #[must_use]
    pub const fn is_database(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::MissingRow { .. } | Self::Config(_)
        )
    }
}
