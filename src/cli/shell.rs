//! The interactive menu.
//!
//! One store stays open for the whole session. Failed operations are reported
//! and the menu comes back; only a prompt failure (for example, stdin closing)
//! ends the session early. The store is always closed on the way out, which
//! flushes the flat files and writes the shutdown audit entry.

use std::path::PathBuf;

use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use quartermaster::{
    Classification, EquipmentDraft, EquipmentId, Priority, RequestDraft, RequestId,
    RequestStatus, Store,
};
use tracing::instrument;

use super::{
    list::render_table, low_stock::print_alerts, requests, show::print_details,
    terminal::Colorize,
};

#[derive(Debug, Parser, Default)]
#[command(about = "Run the interactive menu")]
pub struct Shell {}

const MENU: [&str; 10] = [
    "Add equipment",
    "Search equipment",
    "List all equipment",
    "Update quantity",
    "Request supply",
    "Check supply requests",
    "Review a supply request",
    "Low stock alerts",
    "Export report",
    "Save and exit",
];

impl Shell {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = super::open_store(root)?;
        let theme = ColorfulTheme::default();

        println!("{}", "TACTICAL EQUIPMENT TRACKER".info());
        println!(
            "{}",
            format!("Data source: {}", store.backend_kind().data_source()).dim()
        );

        let outcome: anyhow::Result<()> = loop {
            let choice = match Select::with_theme(&theme)
                .with_prompt("Select an option")
                .items(&MENU[..])
                .default(0)
                .interact()
            {
                Ok(choice) => choice,
                Err(e) => break Err(e.into()),
            };

            let result = match choice {
                0 => add(&mut store, &theme),
                1 => search(&store, &theme),
                2 => {
                    let items: Vec<_> = store.inventory().equipment_records().iter().collect();
                    render_table(&items, false);
                    Ok(())
                }
                3 => update(&mut store, &theme),
                4 => request(&mut store, &theme),
                5 => {
                    let all: Vec<_> = store.inventory().requests().iter().collect();
                    requests::render_table(&store, &all);
                    Ok(())
                }
                6 => review(&mut store, &theme),
                7 => {
                    let low: Vec<_> = store.list_low_stock().collect();
                    print_alerts(&low);
                    Ok(())
                }
                8 => export(&mut store),
                _ => break Ok(()),
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is::<dialoguer::Error>() => break Err(e),
                Err(e) => eprintln!("{}", format!("❌ {e}").danger()),
            }
            println!();
        };

        store.close()?;
        println!("{}", "Data saved. Goodbye.".success());
        outcome
    }
}

fn add(store: &mut Store, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let name: String = Input::with_theme(theme)
        .with_prompt("Equipment name")
        .interact_text()?;
    let description: String = Input::with_theme(theme)
        .with_prompt("Description")
        .allow_empty(true)
        .interact_text()?;
    let quantity: u32 = Input::with_theme(theme)
        .with_prompt("Quantity")
        .interact_text()?;
    let min_threshold: u32 = Input::with_theme(theme)
        .with_prompt("Minimum threshold")
        .interact_text()?;
    let unit: String = Input::with_theme(theme)
        .with_prompt("Unit of issue")
        .default("ea".to_string())
        .interact_text()?;
    let location: String = Input::with_theme(theme)
        .with_prompt("Storage location")
        .allow_empty(true)
        .interact_text()?;
    let classification = Classification::ALL[Select::with_theme(theme)
        .with_prompt("Classification")
        .items(&Classification::ALL.map(Classification::as_str)[..])
        .default(0)
        .interact()?];

    let id = store.add_equipment(EquipmentDraft {
        name,
        description,
        quantity,
        min_threshold,
        unit,
        location,
        classification,
    })?;
    let item = store.find_by_id(id)?;
    println!(
        "{}",
        format!("✅ Added {} (ID: {id}, checksum {})", item.name(), item.checksum()).success()
    );
    Ok(())
}

fn search(store: &Store, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let query: String = Input::with_theme(theme)
        .with_prompt("Name to search for")
        .interact_text()?;

    let item = store.search_by_name(&query)?;
    print_details(item);

    let others = store.search_all(&query).filter(|other| other.id() != item.id()).count();
    if others > 0 {
        println!("{}", format!("{others} more match(es); try 'qm show --all'").dim());
    }
    Ok(())
}

fn update(store: &mut Store, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let id: EquipmentId = Input::with_theme(theme)
        .with_prompt("Equipment ID")
        .interact_text()?;
    let current = store.find_by_id(id)?;
    println!("Current quantity of {}: {}", current.name(), current.quantity());

    let quantity: u32 = Input::with_theme(theme)
        .with_prompt("New quantity")
        .interact_text()?;
    let previous = store.update_quantity(id, quantity)?;
    println!("{}", format!("✅ Quantity updated: {previous} -> {quantity}").success());
    Ok(())
}

fn request(store: &mut Store, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let equipment_id: EquipmentId = Input::with_theme(theme)
        .with_prompt("Equipment ID")
        .interact_text()?;
    let item = store.find_by_id(equipment_id)?;
    println!("Requesting resupply of {}", item.name());

    let requested_qty: u32 = Input::with_theme(theme)
        .with_prompt("Quantity needed")
        .interact_text()?;
    let requesting_unit: String = Input::with_theme(theme)
        .with_prompt("Requesting unit")
        .interact_text()?;
    let priority = Priority::ALL[Select::with_theme(theme)
        .with_prompt("Priority")
        .items(&Priority::ALL.map(Priority::as_str)[..])
        .default(1)
        .interact()?];

    let id = store.add_request(RequestDraft {
        equipment_id,
        requested_qty,
        requesting_unit,
        priority,
    })?;
    println!("{}", format!("✅ Supply request {id} created").success());
    Ok(())
}

fn review(store: &mut Store, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let id: RequestId = Input::with_theme(theme)
        .with_prompt("Request ID")
        .interact_text()?;
    let status = store.find_request(id)?.status();

    let actions: Vec<(&str, RequestStatus)> = [
        ("Approve", RequestStatus::Approved),
        ("Deny", RequestStatus::Denied),
        ("Mark fulfilled", RequestStatus::Fulfilled),
    ]
    .into_iter()
    .filter(|(_, next)| status.can_transition_to(*next))
    .collect();
    if actions.is_empty() {
        anyhow::bail!("{id} is {status} and cannot change");
    }

    let labels: Vec<&str> = actions.iter().map(|(label, _)| *label).collect();
    let choice = Select::with_theme(theme)
        .with_prompt(format!("{id} is {status}"))
        .items(&labels[..])
        .default(0)
        .interact()?;

    match actions[choice].1 {
        RequestStatus::Approved => store.approve_request(id)?,
        RequestStatus::Denied => store.deny_request(id)?,
        RequestStatus::Fulfilled => store.fulfill_request(id)?,
        RequestStatus::Pending => {}
    }
    let now = store.find_request(id)?.status();
    println!("{}", format!("✅ {id} is now {now}").success());
    Ok(())
}

fn export(store: &mut Store) -> anyhow::Result<()> {
    let path = store.default_report_path();
    store.export_report(&path)?;
    println!(
        "{}",
        format!("✅ Report exported to {}", path.display()).success()
    );
    Ok(())
}
