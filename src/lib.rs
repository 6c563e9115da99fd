//! Equipment Inventory and Supply Requests
//!
//! Equipment records and supply requests are held in memory by an
//! [`Inventory`] and persisted through one of two interchangeable backends: an
//! embedded relational database or a pair of flat binary files.

pub mod domain;
pub use domain::{
    Checksum, Classification, Config, Equipment, EquipmentDraft, EquipmentId, Inventory,
    Priority, RequestDraft, RequestId, RequestStatus, StockStatus, SupplyRequest,
    ValidationError,
};

/// Durable storage backends and the entity store that drives them.
pub mod storage;
pub use storage::{Backend, BackendKind, ErrorKind, Store, StoreError};
