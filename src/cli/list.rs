use std::{fmt, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use quartermaster::{Equipment, StockStatus};
use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use super::terminal::{is_narrow, paint_status, Colorize};

/// Command arguments for `qm list`.
#[derive(Debug, Parser, Default)]
#[command(about = "List equipment in insertion order")]
pub struct List {
    /// Show only records with this stock status.
    #[arg(long, value_enum)]
    status: Option<StatusFilter>,

    /// Regular expression matched against the equipment name.
    #[arg(long)]
    regex: Option<String>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Stock status filter values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Ok,
    Watch,
    Low,
}

impl From<StatusFilter> for StockStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Ok => Self::Ok,
            StatusFilter::Watch => Self::Watch,
            StatusFilter::Low => Self::Low,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open_store(root)?;

        let pattern = self
            .regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("invalid --regex pattern")?;
        let wanted = self.status.map(StockStatus::from);

        let items: Vec<&Equipment> = store
            .inventory()
            .equipment_records()
            .iter()
            .filter(|item| wanted.is_none_or(|status| item.stock_status() == status))
            .filter(|item| pattern.as_ref().is_none_or(|re| re.is_match(item.name())))
            .collect();

        match self.output {
            OutputFormat::Table => render_table(&items, self.quiet),
            OutputFormat::Json => render_json(&items)?,
            OutputFormat::Csv => render_csv(&items, self.quiet),
        }

        store.close()?;
        Ok(())
    }
}

const HEADERS: [&str; 7] = ["ID", "Name", "Qty", "Unit", "Location", "Status", "Class"];

fn columns(item: &Equipment) -> [String; 7] {
    [
        item.id().to_string(),
        item.name().to_string(),
        item.quantity().to_string(),
        item.unit().to_string(),
        item.location().to_string(),
        item.stock_status().to_string(),
        item.classification().to_string(),
    ]
}

/// Renders equipment as an aligned table, colouring the status column.
pub fn render_table(items: &[&Equipment], quiet: bool) {
    if quiet {
        for item in items {
            println!("{}", columns(item).join("\t"));
        }
        return;
    }

    if items.is_empty() {
        println!("No equipment found.");
        return;
    }

    if is_narrow() {
        // Stacked output for narrow terminals
        for item in items {
            println!(
                "{} {} ({} {}) {}",
                item.id().to_string().dim(),
                item.name(),
                item.quantity(),
                item.unit(),
                paint_status(item.stock_status().as_str(), item.stock_status())
            );
        }
        println!("Total Equipment Items: {}", items.len());
        return;
    }

    let data: Vec<[String; 7]> = items.iter().map(|item| columns(item)).collect();
    let widths: Vec<usize> = HEADERS
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            data.iter()
                .map(|row| row[idx].len())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    for (header, width) in HEADERS.iter().zip(&widths) {
        print!("{header:<width$}  ");
    }
    println!();
    for width in &widths {
        print!("{:-<width$}  ", "");
    }
    println!();

    for (item, row) in items.iter().zip(&data) {
        for (idx, value) in row.iter().enumerate() {
            let width = widths[idx];
            let cell = format!("{value:<width$}");
            if HEADERS[idx] == "Status" {
                print!("{}  ", paint_status(&cell, item.stock_status()));
            } else {
                print!("{cell}  ");
            }
        }
        println!();
    }
    println!("{}", format!("Total Equipment Items: {}", items.len()).info());
}

/// A JSON view of one equipment record.
#[derive(Debug, Serialize)]
pub struct EquipmentJson<'a> {
    id: u32,
    name: &'a str,
    description: &'a str,
    quantity: u32,
    min_threshold: u32,
    unit: &'a str,
    location: &'a str,
    classification: &'static str,
    status: &'static str,
    last_updated: String,
    checksum: String,
}

impl<'a> From<&'a Equipment> for EquipmentJson<'a> {
    fn from(item: &'a Equipment) -> Self {
        Self {
            id: item.id().get(),
            name: item.name(),
            description: item.description(),
            quantity: item.quantity(),
            min_threshold: item.min_threshold(),
            unit: item.unit(),
            location: item.location(),
            classification: item.classification().as_str(),
            status: item.stock_status().as_str(),
            last_updated: item.last_updated().to_rfc3339(),
            checksum: item.checksum().to_string(),
        }
    }
}

fn render_json(items: &[&Equipment]) -> anyhow::Result<()> {
    let rows: Vec<EquipmentJson<'_>> = items.iter().map(|item| EquipmentJson::from(*item)).collect();
    serde_json::to_writer_pretty(std::io::stdout(), &rows)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

fn render_csv(items: &[&Equipment], quiet: bool) {
    if !quiet {
        let header_line = HEADERS.map(csv_escape).join(",");
        println!("{header_line}");
    }
    for item in items {
        let values = columns(item).map(|value| csv_escape(&value));
        println!("{}", values.join(","));
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_escape_quotes_commas_and_quotes() {
        assert_eq!(csv_escape("Rope"), "Rope");
        assert_eq!(csv_escape("Tent, Arctic"), "\"Tent, Arctic\"");
        assert_eq!(csv_escape("6\" nails"), "\"6\"\" nails\"");
    }

    #[test]
    fn status_filter_maps_to_stock_status() {
        assert_eq!(StockStatus::from(StatusFilter::Watch), StockStatus::Watch);
    }
}
