//! The append-only audit log file.
//!
//! One line per mutating operation: `[Wed Jun 30 21:49:08 1993] message`,
//! stamped in local time.

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

/// File the audit log is appended to.
pub const AUDIT_FILE: &str = "equipment.log";

const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Appends timestamped entries to a log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// A log at [`AUDIT_FILE`] under `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(AUDIT_FILE),
        }
    }

    /// The log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or written.
    pub fn append(&self, message: &str) -> io::Result<()> {
        self.append_at(Local::now(), message)
    }

    fn append_at(&self, at: DateTime<Local>, message: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_entry(at, message))
    }
}

fn format_entry(at: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", at.format(TIMESTAMP_FORMAT))
}
