use std::path::PathBuf;

use clap::Parser;
use quartermaster::{RequestStatus, Store};
use tracing::instrument;

use super::terminal::{is_narrow, Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Show backend, record counts and stock alerts")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Counts shown by `qm status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Summary {
    equipment: usize,
    capacity: usize,
    requests: usize,
    pending: usize,
    low_stock: usize,
}

impl Summary {
    fn of(store: &Store) -> Self {
        let inventory = store.inventory();
        Self {
            equipment: inventory.equipment_count(),
            capacity: inventory.limits().max_equipment,
            requests: inventory.request_count(),
            pending: inventory
                .requests()
                .iter()
                .filter(|request| request.status() == RequestStatus::Pending)
                .count(),
            low_stock: store.list_low_stock().count(),
        }
    }
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open_store(root)?;
        let summary = Summary::of(&store);
        let backend = store.backend_kind();

        match self.output {
            OutputFormat::Json => {
                use serde_json::json;

                let output = json!({
                    "backend": backend.as_str(),
                    "equipment": {
                        "count": summary.equipment,
                        "capacity": summary.capacity,
                    },
                    "requests": {
                        "count": summary.requests,
                        "pending": summary.pending,
                    },
                    "low_stock": summary.low_stock,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table if self.quiet => {
                println!(
                    "backend={backend} equipment={} requests={} pending={} low={}",
                    summary.equipment, summary.requests, summary.pending, summary.low_stock
                );
            }
            OutputFormat::Table => Self::output_table(backend.data_source(), summary),
        }

        store.close()?;
        Ok(())
    }

    fn output_table(source: &str, summary: Summary) {
        println!("Inventory status");
        println!("{}", "────────────────".dim());

        if is_narrow() {
            println!("Source: {source}");
            println!("Items: {}/{}", summary.equipment, summary.capacity);
            println!("Requests: {} ({} pending)", summary.requests, summary.pending);
        } else {
            println!("{:<18} {source}", "Data source");
            println!(
                "{:<18} {} / {}",
                "Equipment", summary.equipment, summary.capacity
            );
            println!(
                "{:<18} {} ({} pending)",
                "Supply requests", summary.requests, summary.pending
            );
        }

        println!();

        if summary.low_stock == 0 {
            println!("Low stock: {} ✅", "0".success());
        } else {
            println!("Low stock: {} ⚠️", summary.low_stock.to_string().warning());
            println!("{}", "Run 'qm low-stock' to see what needs resupply.".dim());
        }
    }
}
