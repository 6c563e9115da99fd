use std::path::{Path, PathBuf};

mod init;
mod list;
mod low_stock;
mod requests;
mod shell;
mod show;
mod status;
mod terminal;

use clap::ArgAction;
use list::List;
use low_stock::LowStock;
use quartermaster::{
    Classification, EquipmentDraft, EquipmentId, Priority, RequestDraft, RequestId, Store,
};
use requests::Requests;
use shell::Shell;
use show::Show;
use status::Status;
use terminal::Colorize;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The directory holding the inventory data and config
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Opens the store at `root`, telling the user if the database was skipped.
pub(crate) fn open_store(root: impl Into<PathBuf>) -> anyhow::Result<Store> {
    let store = Store::open(root)?;
    if let Some(reason) = store.fallback_reason() {
        eprintln!(
            "{}",
            format!("⚠️  Database unavailable ({reason}); using local files").warning()
        );
    }
    Ok(store)
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show backend, counts and alerts (default)
    Status(Status),

    /// Initialize a new inventory directory
    Init(init::Command),

    /// Add a new equipment record
    Add(Add),

    /// Show detailed information about equipment
    Show(Show),

    /// List equipment with filters
    List(List),

    /// Set the quantity on hand for an item
    Update(Update),

    /// Raise a supply request for an item
    Request(Request),

    /// List supply requests
    Requests(Requests),

    /// Approve a pending supply request
    Approve(Transition),

    /// Deny a pending supply request
    Deny(Transition),

    /// Mark an approved supply request as fulfilled
    Fulfill(Transition),

    /// Show items at or below their resupply threshold
    ///
    /// Exits with status 2 when any item needs resupply.
    LowStock(LowStock),

    /// Export the inventory report
    Report(Report),

    /// Run the interactive menu
    Shell(Shell),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init(command) => command.run(&root)?,
            Self::Add(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Update(command) => command.run(root)?,
            Self::Request(command) => command.run(root)?,
            Self::Requests(command) => command.run(root)?,
            Self::Approve(command) => command.run(root, TransitionKind::Approve)?,
            Self::Deny(command) => command.run(root, TransitionKind::Deny)?,
            Self::Fulfill(command) => command.run(root, TransitionKind::Fulfill)?,
            Self::LowStock(command) => command.run(root)?,
            Self::Report(command) => command.run(&root)?,
            Self::Shell(command) => command.run(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// Display name of the item
    name: String,

    /// Units on hand
    #[arg(long, short, default_value_t = 0)]
    quantity: u32,

    /// Stock level at or below which the item needs resupply
    #[arg(long, short = 't', default_value_t = 0)]
    min_threshold: u32,

    /// Free-text description
    #[arg(long, short, default_value = "")]
    description: String,

    /// Unit of issue, e.g. ea, box, case
    #[arg(long, short, default_value = "ea")]
    unit: String,

    /// Where the stock is held
    #[arg(long, short, default_value = "")]
    location: String,

    /// Sensitivity tag (unclassified, restricted, confidential, secret)
    #[arg(long, short, default_value = "unclassified")]
    classification: Classification,
}

impl Add {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = open_store(root)?;

        let draft = EquipmentDraft {
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            min_threshold: self.min_threshold,
            unit: self.unit,
            location: self.location,
            classification: self.classification,
        };
        let id = store.add_equipment(draft)?;
        let item = store.find_by_id(id)?;
        println!(
            "{}",
            format!("✅ Added {} (ID: {id})", item.name()).success()
        );
        println!("   Checksum: {}", item.checksum());

        store.close()?;
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Update {
    /// The equipment ID
    id: EquipmentId,

    /// The new quantity on hand
    quantity: u32,
}

impl Update {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = open_store(root)?;

        let previous = store.update_quantity(self.id, self.quantity)?;
        let item = store.find_by_id(self.id)?;
        println!(
            "{}",
            format!("✅ {}: {previous} -> {}", item.name(), item.quantity()).success()
        );
        println!("   New checksum: {}", item.checksum());

        store.close()?;
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Request {
    /// The equipment ID being requested
    equipment_id: EquipmentId,

    /// How many units are needed
    quantity: u32,

    /// The requesting unit
    #[arg(long, short)]
    unit: String,

    /// Urgency (low, normal, high, critical)
    #[arg(long, short, default_value = "normal")]
    priority: Priority,
}

impl Request {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = open_store(root)?;

        let id = store.add_request(RequestDraft {
            equipment_id: self.equipment_id,
            requested_qty: self.quantity,
            requesting_unit: self.unit,
            priority: self.priority,
        })?;
        println!("{}", format!("✅ Supply request {id} created").success());

        store.close()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum TransitionKind {
    Approve,
    Deny,
    Fulfill,
}

#[derive(Debug, clap::Parser)]
pub struct Transition {
    /// The request ID, e.g. 3 or REQ-3
    id: RequestId,
}

impl Transition {
    #[instrument]
    fn run(self, root: PathBuf, kind: TransitionKind) -> anyhow::Result<()> {
        let mut store = open_store(root)?;

        match kind {
            TransitionKind::Approve => store.approve_request(self.id)?,
            TransitionKind::Deny => store.deny_request(self.id)?,
            TransitionKind::Fulfill => store.fulfill_request(self.id)?,
        }
        let status = store.find_request(self.id)?.status();
        println!("{}", format!("✅ {} is now {status}", self.id).success());

        store.close()?;
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Report {
    /// Where to write the report (default: inventory_report.txt under the root)
    #[arg(long, short)]
    path: Option<PathBuf>,
}

impl Report {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut store = open_store(root)?;

        let path = self.path.unwrap_or_else(|| store.default_report_path());
        store.export_report(&path)?;
        println!(
            "{}",
            format!("✅ Report exported to {}", path.display()).success()
        );

        store.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quartermaster::{RequestStatus, StockStatus};
    use tempfile::tempdir;

    use super::*;

    fn add(root: &Path, name: &str, quantity: u32, min_threshold: u32) {
        Add {
            name: name.to_string(),
            quantity,
            min_threshold,
            description: String::new(),
            unit: "ea".to_string(),
            location: "Depot".to_string(),
            classification: Classification::Unclassified,
        }
        .run(root.to_path_buf())
        .unwrap();
    }

    #[test]
    fn init_writes_config_and_refuses_to_run_twice() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();

        init::Command::default().run(root).unwrap();
        assert!(root.join("inventory.toml").exists());
        assert!(!root.join("db_config.conf").exists());

        let err = init::Command::default().run(root).unwrap_err();
        assert!(err.to_string().contains("already initialized"));
    }

    #[test]
    fn add_run_persists_equipment() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Rifle Cleaning Kit", 12, 3);

        let store = Store::open(tmp.path()).unwrap();
        let item = store.search_by_name("rifle").unwrap();
        assert_eq!(item.id(), EquipmentId::FIRST);
        assert_eq!(item.quantity(), 12);
        assert_eq!(item.location(), "Depot");
    }

    #[test]
    fn add_run_rejects_an_empty_name() {
        let tmp = tempdir().unwrap();
        let result = Add {
            name: String::new(),
            quantity: 1,
            min_threshold: 0,
            description: String::new(),
            unit: "ea".to_string(),
            location: String::new(),
            classification: Classification::Unclassified,
        }
        .run(tmp.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn update_run_changes_quantity_and_stock_status() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Batteries", 50, 10);

        Update {
            id: EquipmentId::FIRST,
            quantity: 4,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        let store = Store::open(tmp.path()).unwrap();
        let item = store.find_by_id(EquipmentId::FIRST).unwrap();
        assert_eq!(item.quantity(), 4);
        assert_eq!(item.stock_status(), StockStatus::Low);
    }

    #[test]
    fn request_lifecycle_runs_through_the_cli() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Field Rations", 20, 5);

        Request {
            equipment_id: EquipmentId::FIRST,
            quantity: 40,
            unit: "Alpha Company".to_string(),
            priority: Priority::High,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        Transition { id: RequestId::FIRST }
            .run(tmp.path().to_path_buf(), TransitionKind::Approve)
            .unwrap();
        Transition { id: RequestId::FIRST }
            .run(tmp.path().to_path_buf(), TransitionKind::Fulfill)
            .unwrap();

        let store = Store::open(tmp.path()).unwrap();
        let request = store.find_request(RequestId::FIRST).unwrap();
        assert_eq!(request.status(), RequestStatus::Fulfilled);
        assert_eq!(request.priority(), Priority::High);
    }

    #[test]
    fn request_run_rejects_unknown_equipment() {
        let tmp = tempdir().unwrap();
        let result = Request {
            equipment_id: EquipmentId::FIRST,
            quantity: 1,
            unit: "Bravo".to_string(),
            priority: Priority::Normal,
        }
        .run(tmp.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn deny_run_rejects_a_second_transition() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Tent", 2, 1);
        Request {
            equipment_id: EquipmentId::FIRST,
            quantity: 1,
            unit: "Charlie".to_string(),
            priority: Priority::Low,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        Transition { id: RequestId::FIRST }
            .run(tmp.path().to_path_buf(), TransitionKind::Deny)
            .unwrap();
        let again = Transition { id: RequestId::FIRST }
            .run(tmp.path().to_path_buf(), TransitionKind::Approve);
        assert!(again.is_err());
    }

    #[test]
    fn report_run_writes_to_the_default_path() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Radio", 3, 1);

        Report { path: None }.run(tmp.path()).unwrap();

        let report = std::fs::read_to_string(tmp.path().join("inventory_report.txt")).unwrap();
        assert!(report.contains("TACTICAL SUPPLY INVENTORY REPORT"));
        assert!(report.contains("Radio"));
    }

    #[test]
    fn status_run_reports_counts_without_exit() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Compass", 8, 2);

        Status::default().run(tmp.path().to_path_buf()).unwrap();
        List::default().run(tmp.path().to_path_buf()).unwrap();
        Requests::default().run(tmp.path().to_path_buf()).unwrap();
    }

    #[test]
    fn commands_write_the_audit_log() {
        let tmp = tempdir().unwrap();
        add(tmp.path(), "Flashlight", 6, 2);

        let log = std::fs::read_to_string(tmp.path().join("equipment.log")).unwrap();
        assert!(log.contains("Added equipment: Flashlight (ID: 1)"));
        assert!(log.contains("System shutdown"));
    }
}
