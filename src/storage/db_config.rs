//! The key=value database connection file.
//!
//! ```text
//! host=localhost
//! port=5432
//! dbname=supply
//! user=quartermaster
//! password=changeme
//! ```
//!
//! Blank lines, `#` comments and unknown keys are ignored. Only `dbname` is
//! required: the database is embedded, so it names the database file. The
//! remaining keys are kept for compatibility with existing connection files.

use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Database connection settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DbConfig {
    /// Server host. Recorded but unused by the embedded engine.
    pub host: Option<String>,
    /// Server port. Recorded but unused by the embedded engine.
    pub port: Option<u16>,
    /// Database name. Selects `<dbname>.sqlite3` under the inventory root.
    pub dbname: String,
    /// User name. Recorded but unused by the embedded engine.
    pub user: Option<String>,
    /// Password. Never logged.
    pub password: Option<String>,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Errors raised while reading the connection file.
#[derive(Debug, thiserror::Error)]
pub enum DbConfigError {
    /// The file could not be read.
    #[error("failed to read database config {}: {source}", path.display())]
    Read {
        /// The connection file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// `dbname` was absent or empty.
    #[error("database config {} does not name a database (missing 'dbname')", path.display())]
    MissingDbName {
        /// The connection file.
        path: PathBuf,
    },

    /// `port` was not a port number.
    #[error("database config {}: invalid port '{value}'", path.display())]
    InvalidPort {
        /// The connection file.
        path: PathBuf,
        /// The offending value.
        value: String,
    },
}

impl DbConfig {
    /// Reads and parses a connection file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, has no `dbname`, or has a malformed
    /// `port`.
    pub fn load(path: &Path) -> Result<Self, DbConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| DbConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, DbConfigError> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!(line, "ignoring line without '=' in database config");
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "host" => config.host = non_empty(value),
                "port" => {
                    config.port = if value.is_empty() {
                        None
                    } else {
                        Some(value.parse().map_err(|_| DbConfigError::InvalidPort {
                            path: path.to_path_buf(),
                            value: value.to_string(),
                        })?)
                    };
                }
                "dbname" => value.clone_into(&mut config.dbname),
                "user" => config.user = non_empty(value),
                "password" => config.password = non_empty(value),
                other => tracing::debug!(key = other, "ignoring unknown database config key"),
            }
        }

        if config.dbname.is_empty() {
            return Err(DbConfigError::MissingDbName {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }

    /// The database file this configuration selects under `root`.
    #[must_use]
    pub fn database_path(&self, root: &Path) -> PathBuf {
        root.join(format!("{}.sqlite3", self.dbname))
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
