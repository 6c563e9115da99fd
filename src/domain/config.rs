use std::{fmt, path::Path, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{Limits, ParseCodeError};

/// Which persistence backend the store should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Try the database, fall back to flat files if it cannot be opened.
    #[default]
    Auto,
    /// Flat files only. The database is never touched.
    File,
    /// The database is required.
    Database,
}

impl BackendPreference {
    /// The lowercase configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::File => "file",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendPreference {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "file" | "files" => Ok(Self::File),
            "database" | "db" => Ok(Self::Database),
            _ => Err(ParseCodeError::new("backend", s)),
        }
    }
}

/// Application settings for an inventory root.
///
/// Stored as `inventory.toml` in the root directory. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Capacity of the equipment table.
    pub max_equipment: usize,

    /// Capacity of the supply request table.
    pub max_requests: usize,

    /// Which backend to open.
    pub backend: BackendPreference,

    /// Path of the key=value database connection file.
    ///
    /// Relative paths are resolved against the inventory root.
    pub db_config: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_equipment: default_max_equipment(),
            max_requests: default_max_requests(),
            backend: BackendPreference::default(),
            db_config: default_db_config(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The table capacities.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        Limits {
            max_equipment: self.max_equipment,
            max_requests: self.max_requests,
        }
    }

    /// The database connection file, resolved against `root`.
    #[must_use]
    pub fn db_config_path(&self, root: &Path) -> PathBuf {
        root.join(&self.db_config)
    }
}

const fn default_max_equipment() -> usize {
    1000
}

const fn default_max_requests() -> usize {
    500
}

fn default_db_config() -> PathBuf {
    PathBuf::from("db_config.conf")
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_max_equipment")]
        max_equipment: usize,

        #[serde(default = "default_max_requests")]
        max_requests: usize,

        #[serde(default)]
        backend: BackendPreference,

        #[serde(default = "default_db_config")]
        db_config: PathBuf,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                max_equipment,
                max_requests,
                backend,
                db_config,
            } => Self {
                max_equipment,
                max_requests,
                backend,
                db_config,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            max_equipment: config.max_equipment,
            max_requests: config.max_requests,
            backend: config.backend,
            db_config: config.db_config,
        }
    }
}
