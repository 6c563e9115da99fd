//! Domain models for the equipment inventory.
//!
//! This module contains the core domain types including equipment records,
//! supply requests, the derived checksum and stock status, the name index,
//! and configuration. Nothing in here touches the filesystem.

use chrono::{DateTime, SubsecRound, Utc};

/// Checksum and stock-status derivation.
pub mod checksum;
pub use checksum::{compute_checksum, stock_status, Checksum, StockStatus};

/// Equipment records and their identifiers.
pub mod equipment;
pub use equipment::{Classification, Equipment, EquipmentDraft, EquipmentId};

/// Supply requests and their lifecycle.
pub mod request;
pub use request::{Priority, RequestDraft, RequestId, RequestStatus, SupplyRequest};

mod config;
pub use config::{BackendPreference, Config};

mod inventory;
pub use inventory::{Inventory, InventoryError, Limits, Snapshot, SnapshotRef, Table};

mod name_index;
pub use name_index::NameIndex;

mod validation;
pub use validation::{limits, ParseCodeError, ParseIdError, ValidationError};

/// The current time, truncated to whole seconds.
///
/// Both backends persist timestamps at second resolution, so anything that is
/// stamped in memory is stamped at that resolution too.
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
