/// The backend contract.
pub mod backend;
pub mod database;
pub mod db_config;
pub mod flat_file;
mod audit;
mod record;
/// Plain-text report export.
pub mod report;
mod store;

pub use audit::{AuditLog, AUDIT_FILE};
pub use backend::{Backend, BackendError, BackendKind};
pub use database::SqliteBackend;
pub use db_config::{DbConfig, DbConfigError};
pub use flat_file::{FlatFileBackend, EQUIPMENT_FILE, REQUESTS_FILE};
pub use store::{ErrorKind, Store, StoreError, CONFIG_FILE};
