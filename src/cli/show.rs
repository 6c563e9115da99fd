use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use quartermaster::{Equipment, EquipmentId, StockStatus, Store};
use tracing::instrument;

use super::{
    list::EquipmentJson,
    terminal::{classification_banner, Colorize},
};

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about equipment")]
pub struct Show {
    /// Name (or part of a name) to search for, case-insensitive
    query: String,

    /// Treat the query as an equipment ID
    #[arg(long, conflicts_with = "all")]
    id: bool,

    /// Show every matching record, not just the first
    #[arg(long)]
    all: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open_store(root)?;
        let items = self.resolve(&store)?;

        match self.output {
            OutputFormat::Pretty => {
                for item in &items {
                    print_details(item);
                }
            }
            OutputFormat::Json => {
                let rows: Vec<EquipmentJson<'_>> =
                    items.iter().map(|item| EquipmentJson::from(*item)).collect();
                if self.all {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else if let Some(row) = rows.first() {
                    println!("{}", serde_json::to_string_pretty(row)?);
                }
            }
        }

        store.close()?;
        Ok(())
    }

    fn resolve<'a>(&self, store: &'a Store) -> anyhow::Result<Vec<&'a Equipment>> {
        if self.id {
            let id: EquipmentId = self
                .query
                .parse()
                .with_context(|| format!("'{}' is not an equipment ID", self.query))?;
            return Ok(vec![store.find_by_id(id)?]);
        }
        if self.all {
            let items: Vec<_> = store.search_all(&self.query).collect();
            if items.is_empty() {
                anyhow::bail!("no equipment matching '{}'", self.query);
            }
            return Ok(items);
        }
        Ok(vec![store.search_by_name(&self.query)?])
    }
}

/// Prints the full record with its classification banner and stock status.
pub fn print_details(item: &Equipment) {
    println!("{}", classification_banner(item.classification()));
    println!("{}", "EQUIPMENT DETAILS".info());
    println!("{}", "─".repeat(40).dim());
    println!("  ID:            {}", item.id());
    println!("  Name:          {}", item.name());
    if !item.description().is_empty() {
        println!("  Description:   {}", item.description());
    }
    println!("  Quantity:      {} {}", item.quantity(), item.unit());
    println!("  Location:      {}", item.location());
    println!("  Min Threshold: {}", item.min_threshold());
    match item.stock_status() {
        StockStatus::Low => println!("  Status:        {}", "LOW STOCK - RESUPPLY REQUIRED".danger()),
        StockStatus::Watch => println!("  Status:        {}", "WATCH - monitor stock levels".warning()),
        StockStatus::Ok => println!("  Status:        {}", "ADEQUATE".success()),
    }
    println!(
        "  Last Updated:  {}",
        item.last_updated()
            .with_timezone(&chrono::Local)
            .format("%a %b %e %H:%M:%S %Y")
    );
    println!("  Checksum:      {}", item.checksum());
    println!();
}
