use std::{path::PathBuf, process};

use clap::Parser;
use quartermaster::Equipment;
use tracing::instrument;

use super::{list::EquipmentJson, terminal::Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Show equipment at or below its resupply threshold")]
pub struct LowStock {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl LowStock {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open_store(root)?;
        let low: Vec<&Equipment> = store.list_low_stock().collect();

        match self.output {
            OutputFormat::Table => print_alerts(&low),
            OutputFormat::Json => {
                let rows: Vec<EquipmentJson<'_>> =
                    low.iter().map(|item| EquipmentJson::from(*item)).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }

        let any_low = !low.is_empty();
        store.close()?;

        // Exit with a non-zero code when anything needs resupply.
        if any_low {
            process::exit(2);
        }
        Ok(())
    }
}

/// Prints one alert line per low item, then a total.
pub fn print_alerts(low: &[&Equipment]) {
    if low.is_empty() {
        println!("{}", "All equipment levels are adequate. ✅".success());
        return;
    }

    println!("{}", "LOW STOCK ALERTS".danger());
    for item in low {
        println!(
            "  🚨 {} {}: {} {} (threshold {}) at {}",
            item.id().to_string().dim(),
            item.name(),
            item.quantity(),
            item.unit(),
            item.min_threshold(),
            if item.location().is_empty() {
                "unknown location"
            } else {
                item.location()
            },
        );
    }
    println!(
        "{}",
        format!("Total items requiring resupply: {}", low.len()).danger()
    );
}
