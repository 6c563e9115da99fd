use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use quartermaster::{RequestStatus, Store, SupplyRequest};
use serde::Serialize;
use tracing::instrument;

use super::terminal::Colorize;

/// Command arguments for `qm requests`.
#[derive(Debug, Parser, Default)]
#[command(about = "List supply requests")]
pub struct Requests {
    /// Show only requests with this status.
    #[arg(long, value_enum)]
    status: Option<StatusFilter>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StatusFilter {
    Pending,
    Approved,
    Fulfilled,
    Denied,
}

impl From<StatusFilter> for RequestStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Approved => Self::Approved,
            StatusFilter::Fulfilled => Self::Fulfilled,
            StatusFilter::Denied => Self::Denied,
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestJson<'a> {
    id: u32,
    equipment_id: u32,
    equipment_name: Option<&'a str>,
    requested_qty: u32,
    requesting_unit: &'a str,
    priority: &'static str,
    status: &'static str,
    request_time: String,
}

impl Requests {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open_store(root)?;
        let wanted = self.status.map(RequestStatus::from);
        let requests: Vec<&SupplyRequest> = store
            .inventory()
            .requests()
            .iter()
            .filter(|request| wanted.is_none_or(|status| request.status() == status))
            .collect();

        match self.output {
            OutputFormat::Table => render_table(&store, &requests),
            OutputFormat::Json => {
                let rows: Vec<_> = requests
                    .iter()
                    .map(|request| RequestJson {
                        id: request.id().get(),
                        equipment_id: request.equipment_id().get(),
                        equipment_name: equipment_name(&store, request),
                        requested_qty: request.requested_qty(),
                        requesting_unit: request.requesting_unit(),
                        priority: request.priority().as_str(),
                        status: request.status().as_str(),
                        request_time: request.request_time().to_rfc3339(),
                    })
                    .collect();
                serde_json::to_writer_pretty(std::io::stdout(), &rows)
                    .context("failed to render json output")?;
                println!();
            }
        }

        store.close()?;
        Ok(())
    }
}

fn equipment_name<'a>(store: &'a Store, request: &SupplyRequest) -> Option<&'a str> {
    store
        .find_by_id(request.equipment_id())
        .ok()
        .map(quartermaster::Equipment::name)
}

/// Renders supply requests as a table, newest last.
pub fn render_table(store: &Store, requests: &[&SupplyRequest]) {
    if requests.is_empty() {
        println!("No supply requests found.");
        return;
    }

    println!(
        "{:<9} {:<24} {:>6}  {:<16} {:<9} {:<10} {}",
        "REQ ID", "EQUIPMENT", "QTY", "UNIT", "PRIORITY", "STATUS", "REQUESTED"
    );
    println!("{}", "─".repeat(96).dim());
    for request in requests {
        let name = equipment_name(store, request).unwrap_or("(unknown)");
        let status = format!("{:<10}", request.status().as_str());
        let status = match request.status() {
            RequestStatus::Pending => status.warning(),
            RequestStatus::Approved => status.info(),
            RequestStatus::Fulfilled => status.success(),
            RequestStatus::Denied => status.dim(),
        };
        println!(
            "{:<9} {:<24} {:>6}  {:<16} {:<9} {status} {}",
            request.id().to_string(),
            truncate(name, 24),
            request.requested_qty(),
            truncate(request.requesting_unit(), 16),
            request.priority().as_str(),
            request
                .request_time()
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
        );
    }
    println!("{}", format!("Total Requests: {}", requests.len()).info());
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
