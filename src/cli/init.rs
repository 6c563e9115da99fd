use std::{fs, path::Path};

use quartermaster::{domain::BackendPreference, storage::CONFIG_FILE, Config};
use tracing::instrument;

#[derive(Debug, clap::Parser, Default)]
pub struct Command {
    /// Which backend to use (auto, file, database)
    #[arg(long, value_name = "BACKEND", default_value = "auto")]
    backend: BackendPreference,

    /// Write a database config naming this database
    #[arg(long, value_name = "NAME")]
    dbname: Option<String>,

    /// Maximum number of equipment records
    #[arg(long, value_name = "N")]
    max_equipment: Option<usize>,

    /// Maximum number of supply requests
    #[arg(long, value_name = "N")]
    max_requests: Option<usize>,
}

impl Command {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!("Inventory already initialized (found existing {CONFIG_FILE})");
        }

        fs::create_dir_all(root)
            .map_err(|e| anyhow::anyhow!("Failed to create inventory directory: {e}"))?;

        let mut config = Config {
            backend: self.backend,
            ..Config::default()
        };
        if let Some(max) = self.max_equipment {
            config.max_equipment = max;
        }
        if let Some(max) = self.max_requests {
            config.max_requests = max;
        }
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

        println!("Initialized inventory in {}", root.display());
        println!("  Created: {CONFIG_FILE} (backend: {})", config.backend);

        if let Some(dbname) = &self.dbname {
            let db_config = config.db_config_path(root);
            if db_config.exists() {
                println!("  Kept:    {} (already present)", config.db_config.display());
            } else {
                fs::write(&db_config, format!("# database connection\ndbname={dbname}\n"))
                    .map_err(|e| anyhow::anyhow!("Failed to create database config: {e}"))?;
                println!("  Created: {}", config.db_config.display());
            }
        }

        println!();
        println!("Next steps:");
        println!("  qm add \"Your First Item\" --quantity 10 --min-threshold 2");

        Ok(())
    }
}
