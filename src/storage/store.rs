//! The entity store.
//!
//! The [`Store`] wires the in-memory [`Inventory`] to whichever [`Backend`] was
//! selected at startup, and writes an audit entry for every mutation.
//!
//! Every mutating operation follows the same order: validate, build the new
//! record off to the side, hand it to the backend, and only once the backend
//! has accepted it, apply it to memory. A failed backend write leaves memory
//! exactly as it was.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Local;
use tracing::instrument;

use crate::{
    domain::{
        timestamp_now, BackendPreference, Config, Equipment, EquipmentDraft, EquipmentId,
        Inventory, InventoryError, Limits, RequestDraft, RequestId, RequestStatus, SupplyRequest,
        ValidationError,
    },
    storage::{
        audit::AuditLog,
        backend::{Backend, BackendError, BackendKind},
        database::SqliteBackend,
        flat_file::FlatFileBackend,
        report::{write_report, REPORT_FILE},
    },
};

/// Application config file under the inventory root.
pub const CONFIG_FILE: &str = "inventory.toml";

/// An inventory opened against a persistence backend.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    inventory: Inventory,
    backend: Box<dyn Backend>,
    audit: AuditLog,
    /// Why the database was passed over at startup, if it was.
    fallback: Option<BackendError>,
}

impl Store {
    /// Opens the inventory at `root`, reading `inventory.toml` if present.
    ///
    /// # Errors
    ///
    /// Fails if the selected backend cannot be opened or its data cannot be
    /// loaded. With the `auto` preference a database failure is not an error;
    /// the store falls back to flat files and reports why through
    /// [`Store::fallback_reason`].
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let config = load_config(&root);
        Self::open_with_config(root, &config)
    }

    /// Opens the inventory at `root` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`Store::open`].
    #[instrument(skip(config), fields(backend = %config.backend))]
    pub fn open_with_config(root: PathBuf, config: &Config) -> Result<Self, StoreError> {
        let limits = config.limits();
        match config.backend {
            BackendPreference::File => {
                Self::with_backend(root.clone(), Box::new(FlatFileBackend::new(&root)), limits)
            }
            BackendPreference::Database => {
                let backend = SqliteBackend::from_config(&root, &config.db_config_path(&root))
                    .map_err(StoreError::backend("open database"))?;
                Self::with_backend(root, Box::new(backend), limits)
            }
            BackendPreference::Auto => {
                let attempt = SqliteBackend::from_config(&root, &config.db_config_path(&root))
                    .map_err(StoreError::backend("open database"))
                    .and_then(|db| Self::with_backend(root.clone(), Box::new(db), limits));

                match attempt {
                    Ok(store) => Ok(store),
                    Err(StoreError::Backend { source, .. }) if source.is_database() => {
                        tracing::warn!(
                            error = %source,
                            "database unavailable, falling back to local files"
                        );
                        let mut store = Self::with_backend(
                            root.clone(),
                            Box::new(FlatFileBackend::new(&root)),
                            limits,
                        )?;
                        store.fallback = Some(source);
                        Ok(store)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Opens the inventory at `root` on a specific backend, loading its data.
    ///
    /// # Errors
    ///
    /// Fails if the backend's data cannot be loaded.
    pub fn with_backend(
        root: PathBuf,
        mut backend: Box<dyn Backend>,
        limits: Limits,
    ) -> Result<Self, StoreError> {
        let snapshot = backend.load().map_err(StoreError::backend("load"))?;
        let inventory = Inventory::from_snapshot(snapshot, limits)?;
        tracing::info!(
            backend = %backend.kind(),
            equipment = inventory.equipment_count(),
            requests = inventory.request_count(),
            "inventory ready"
        );

        Ok(Self {
            audit: AuditLog::new(&root),
            root,
            inventory,
            backend,
            fallback: None,
        })
    }

    /// The inventory root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The in-memory tables.
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Which backend is active.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Why the database was not used, if the store fell back to local files.
    #[must_use]
    pub const fn fallback_reason(&self) -> Option<&BackendError> {
        self.fallback.as_ref()
    }

    /// Adds a new equipment record and returns its identifier.
    ///
    /// # Errors
    ///
    /// Fails if a field is out of bounds, the equipment table is full, or the
    /// backend rejects the write. Nothing changes in memory on failure.
    #[instrument(skip(self), fields(name = %draft.name))]
    pub fn add_equipment(&mut self, draft: EquipmentDraft) -> Result<EquipmentId, StoreError> {
        draft.validate()?;
        self.inventory.ensure_equipment_capacity()?;

        let mut item = Equipment::new(self.inventory.next_equipment_id(), draft, timestamp_now())?;
        self.backend
            .insert_equipment(&mut item)
            .map_err(StoreError::backend("insert equipment"))?;

        let message = format!("Added equipment: {} (ID: {})", item.name(), item.id());
        let id = self.inventory.insert_equipment(item)?;
        tracing::info!(%id, "added equipment");
        self.record(&message);
        Ok(id)
    }

    /// Sets the quantity on hand, returning the previous quantity.
    ///
    /// # Errors
    ///
    /// Fails if no record has `id`, the quantity is out of bounds, or the
    /// backend rejects the write.
    #[instrument(skip(self))]
    pub fn update_quantity(&mut self, id: EquipmentId, quantity: u32) -> Result<u32, StoreError> {
        let mut item = self.find_by_id(id)?.clone();
        let previous = item.set_quantity(quantity, timestamp_now())?;
        self.backend
            .update_equipment(&item)
            .map_err(StoreError::backend("update equipment"))?;

        let message = format!(
            "Updated {} quantity: {previous} -> {quantity}",
            item.name()
        );
        self.inventory.replace_equipment(item)?;
        tracing::info!(%id, previous, quantity, "updated quantity");
        self.record(&message);
        Ok(previous)
    }

    /// Looks up an equipment record by identifier.
    ///
    /// # Errors
    ///
    /// [`StoreError::EquipmentNotFound`] if no record has `id`.
    pub fn find_by_id(&self, id: EquipmentId) -> Result<&Equipment, StoreError> {
        self.inventory
            .equipment(id)
            .ok_or(StoreError::EquipmentNotFound(id))
    }

    /// Finds the earliest-inserted record whose name contains `query`,
    /// ignoring case.
    ///
    /// # Errors
    ///
    /// [`StoreError::NameNotFound`] if nothing matches.
    pub fn search_by_name(&self, query: &str) -> Result<&Equipment, StoreError> {
        self.inventory
            .search_by_name(query)
            .ok_or_else(|| StoreError::NameNotFound(query.to_string()))
    }

    /// Every record whose name contains `query`, ignoring case.
    pub fn search_all<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Equipment> + 'a {
        self.inventory.matching_name(query)
    }

    /// Looks up a supply request by identifier.
    ///
    /// # Errors
    ///
    /// [`StoreError::RequestNotFound`] if no request has `id`.
    pub fn find_request(&self, id: RequestId) -> Result<&SupplyRequest, StoreError> {
        self.inventory
            .request(id)
            .ok_or(StoreError::RequestNotFound(id))
    }

    /// Raises a new, pending supply request and returns its identifier.
    ///
    /// # Errors
    ///
    /// Fails if the equipment does not exist, a field is out of bounds, the
    /// request table is full, or the backend rejects the write.
    #[instrument(skip(self), fields(equipment = %draft.equipment_id))]
    pub fn add_request(&mut self, draft: RequestDraft) -> Result<RequestId, StoreError> {
        self.find_by_id(draft.equipment_id)?;
        draft.validate()?;
        self.inventory.ensure_request_capacity()?;

        let mut request = SupplyRequest::new(self.inventory.next_request_id(), draft, timestamp_now())?;
        self.backend
            .insert_request(&mut request)
            .map_err(StoreError::backend("insert supply request"))?;

        let message = format!(
            "Supply request created: {} for equipment ID {}",
            request.id(),
            request.equipment_id()
        );
        let id = self.inventory.insert_request(request)?;
        tracing::info!(%id, "raised supply request");
        self.record(&message);
        Ok(id)
    }

    /// Moves a pending request to approved.
    ///
    /// # Errors
    ///
    /// Fails if the request does not exist, is not pending, or the backend
    /// rejects the write.
    pub fn approve_request(&mut self, id: RequestId) -> Result<(), StoreError> {
        self.transition_request(id, RequestStatus::Approved)
    }

    /// Moves a pending request to denied.
    ///
    /// # Errors
    ///
    /// Fails if the request does not exist, is not pending, or the backend
    /// rejects the write.
    pub fn deny_request(&mut self, id: RequestId) -> Result<(), StoreError> {
        self.transition_request(id, RequestStatus::Denied)
    }

    /// Moves an approved request to fulfilled.
    ///
    /// Stock levels are not touched; record the issue with
    /// [`Store::update_quantity`].
    ///
    /// # Errors
    ///
    /// Fails if the request does not exist, is not approved, or the backend
    /// rejects the write.
    pub fn fulfill_request(&mut self, id: RequestId) -> Result<(), StoreError> {
        self.transition_request(id, RequestStatus::Fulfilled)
    }

    #[instrument(skip(self))]
    fn transition_request(&mut self, id: RequestId, next: RequestStatus) -> Result<(), StoreError> {
        let mut request = self.find_request(id)?.clone();
        let previous = request.transition(next)?;
        self.backend
            .update_request(&request)
            .map_err(StoreError::backend("update supply request"))?;

        self.inventory.replace_request(request)?;
        tracing::info!(%id, %previous, %next, "supply request status changed");
        self.record(&format!("Supply request {id}: {previous} -> {next}"));
        Ok(())
    }

    /// Records at or below their resupply threshold, in insertion order.
    pub fn list_low_stock(&self) -> impl Iterator<Item = &Equipment> + '_ {
        self.inventory.low_stock()
    }

    /// The default report location under the root.
    #[must_use]
    pub fn default_report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    /// Writes a plain-text inventory report to `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn export_report(&mut self, path: &Path) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
        write_report(&mut out, &self.inventory, self.backend.kind(), Local::now())
            .map_err(io_err)?;
        out.flush().map_err(io_err)?;

        self.record("Inventory report exported");
        Ok(())
    }

    /// Writes the full state through the backend's bulk save.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot save.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.backend
            .save(self.inventory.as_snapshot())
            .map_err(StoreError::backend("save"))
    }

    /// Saves and shuts the store down.
    ///
    /// # Errors
    ///
    /// Fails if the final save fails. The shutdown is still audited.
    pub fn close(mut self) -> Result<(), StoreError> {
        let saved = self.flush();
        self.record("System shutdown");
        saved
    }

    /// Appends an audit entry to the log file and the backend. Failures are
    /// logged and otherwise ignored.
    fn record(&mut self, message: &str) {
        if let Err(e) = self.audit.append(message) {
            tracing::warn!(path = %self.audit.path().display(), error = %e, "failed to write audit log");
        }
        if let Err(e) = self.backend.record_audit(message) {
            tracing::warn!(error = %e, "failed to write audit row");
        }
    }
}

fn load_config(root: &Path) -> Config {
    let path = root.join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

/// The broad class of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An identifier or name did not resolve.
    NotFound,
    /// A table is full.
    CapacityExceeded,
    /// Input was out of bounds, or a change is not permitted.
    Validation,
    /// The database could not be reached or rejected a statement.
    BackendUnavailable,
    /// A local file could not be read or written.
    Io,
}

/// Errors returned by [`Store`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No equipment record has this identifier.
    #[error("no equipment with id {0}")]
    EquipmentNotFound(EquipmentId),

    /// No equipment name contains this text.
    #[error("no equipment matching '{0}'")]
    NameNotFound(String),

    /// No supply request has this identifier.
    #[error("no supply request {0}")]
    RequestNotFound(RequestId),

    /// Input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The in-memory tables refused the change.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// The backend failed.
    #[error("{operation} failed: {source}")]
    Backend {
        /// What the store was doing.
        operation: &'static str,
        /// The backend failure.
        source: BackendError,
    },

    /// A file outside the backend could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

impl StoreError {
    fn backend(operation: &'static str) -> impl Fn(BackendError) -> Self {
        move |source| Self::Backend { operation, source }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EquipmentNotFound(_) | Self::NameNotFound(_) | Self::RequestNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Validation(_) => ErrorKind::Validation,
            Self::Inventory(e) => match e {
                InventoryError::CapacityExceeded { .. } | InventoryError::IdsExhausted(_) => {
                    ErrorKind::CapacityExceeded
                }
                InventoryError::UnknownEquipment(_) | InventoryError::UnknownRequest(_) => {
                    ErrorKind::NotFound
                }
                InventoryError::DuplicateEquipment(_) | InventoryError::DuplicateRequest(_) => {
                    ErrorKind::Validation
                }
            },
            Self::Backend { source, .. } => {
                if source.is_database() {
                    ErrorKind::BackendUnavailable
                } else {
                    ErrorKind::Io
                }
            }
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{Classification, Priority, StockStatus, Table};

    fn file_store(root: &Path) -> Store {
        let config = Config {
            backend: BackendPreference::File,
            ..Config::default()
        };
        Store::open_with_config(root.to_path_buf(), &config).unwrap()
    }

    fn memory_db_store(root: &Path) -> Store {
        Store::with_backend(
            root.to_path_buf(),
            Box::new(SqliteBackend::open_in_memory().unwrap()),
            Limits::default(),
        )
        .unwrap()
    }

    fn request_for(id: EquipmentId, qty: u32) -> RequestDraft {
        RequestDraft {
            equipment_id: id,
            requested_qty: qty,
            requesting_unit: "1st Platoon".to_string(),
            priority: Priority::High,
        }
    }

    /// A backend whose every write fails.
    #[derive(Debug, Default)]
    struct Unreachable;

    impl Backend for Unreachable {
        fn kind(&self) -> BackendKind {
            BackendKind::Database
        }

        fn load(&mut self) -> Result<crate::domain::Snapshot, BackendError> {
            Ok(crate::domain::Snapshot::default())
        }

        fn insert_equipment(&mut self, _: &mut Equipment) -> Result<(), BackendError> {
            Err(rusqlite::Error::QueryReturnedNoRows.into())
        }

        fn update_equipment(&mut self, _: &Equipment) -> Result<(), BackendError> {
            Err(rusqlite::Error::QueryReturnedNoRows.into())
        }

        fn insert_request(&mut self, _: &mut SupplyRequest) -> Result<(), BackendError> {
            Err(rusqlite::Error::QueryReturnedNoRows.into())
        }

        fn update_request(&mut self, _: &SupplyRequest) -> Result<(), BackendError> {
            Err(rusqlite::Error::QueryReturnedNoRows.into())
        }

        fn save(&mut self, _: crate::domain::SnapshotRef<'_>) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn added_equipment_is_findable_and_sealed() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());

        let id = store
            .add_equipment(EquipmentDraft::new("Tent, Arctic 10-person", 12, 4))
            .unwrap();

        let item = store.find_by_id(id).unwrap();
        assert_eq!(item.name(), "Tent, Arctic 10-person");
        assert!(item.checksum_is_current());
        assert_eq!(store.inventory().next_equipment_id(), id.successor().unwrap());
    }

    #[test]
    fn capacity_is_enforced_by_the_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::with_backend(
            tmp.path().to_path_buf(),
            Box::new(FlatFileBackend::new(tmp.path())),
            Limits {
                max_equipment: 1,
                max_requests: 1,
            },
        )
        .unwrap();

        store.add_equipment(EquipmentDraft::new("Rope", 1, 1)).unwrap();
        let err = store
            .add_equipment(EquipmentDraft::new("Tarp", 1, 1))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert!(matches!(
            err,
            StoreError::Inventory(InventoryError::CapacityExceeded {
                table: Table::Equipment,
                ..
            })
        ));
    }

    #[test]
    fn names_with_nul_bytes_are_rejected_before_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());

        let err = store
            .add_equipment(EquipmentDraft::new("Rope\0Coil", 5, 1))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidCharacter { field: "name" })
        ));
        assert_eq!(store.inventory().equipment_count(), 0);
    }

    #[test]
    fn invalid_draft_is_rejected_without_side_effects() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());

        let err = store
            .add_equipment(EquipmentDraft::new("x".repeat(64), 1, 1))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.inventory().equipment_count(), 0);
        assert_eq!(store.inventory().next_equipment_id(), EquipmentId::FIRST);
    }

    #[test]
    fn update_quantity_reseals_and_reports_previous() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        let id = store.add_equipment(EquipmentDraft::new("Rope", 30, 10)).unwrap();
        let before = store.find_by_id(id).unwrap().checksum();

        let previous = store.update_quantity(id, 10).unwrap();

        let item = store.find_by_id(id).unwrap();
        assert_eq!(previous, 30);
        assert_eq!(item.quantity(), 10);
        assert!(item.checksum_is_current());
        assert_ne!(item.checksum(), before);
        assert_eq!(item.stock_status(), StockStatus::Low);
    }

    #[test]
    fn update_of_unknown_id_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        let err = store
            .update_quantity(EquipmentId::new(42).unwrap(), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        let tent = store
            .add_equipment(EquipmentDraft::new("Tent, Arctic 10-person", 4, 1))
            .unwrap();
        let stakes = store.add_equipment(EquipmentDraft::new("TENT STAKES", 200, 50)).unwrap();

        assert_eq!(store.search_by_name("tent").unwrap().id(), tent);
        assert_eq!(store.search_by_name("stakes").unwrap().id(), stakes);
        let all: Vec<_> = store.search_all("tent").map(Equipment::id).collect();
        assert_eq!(all, vec![tent, stakes]);

        let err = store.search_by_name("canteen").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn request_for_unknown_equipment_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());

        let err = store
            .add_request(request_for(EquipmentId::new(99_999).unwrap(), 1))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.inventory().request_count(), 0);
    }

    #[test]
    fn request_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        let item = store.add_equipment(EquipmentDraft::new("Rope", 5, 1)).unwrap();
        let id = store.add_request(request_for(item, 3)).unwrap();

        assert_eq!(store.find_request(id).unwrap().status(), RequestStatus::Pending);

        // cannot fulfil before approval
        let err = store.fulfill_request(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        store.approve_request(id).unwrap();
        store.fulfill_request(id).unwrap();
        assert_eq!(
            store.find_request(id).unwrap().status(),
            RequestStatus::Fulfilled
        );
        // fulfilment does not move stock
        assert_eq!(store.find_by_id(item).unwrap().quantity(), 5);

        assert_eq!(store.deny_request(id).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(
            store
                .approve_request(RequestId::new(77).unwrap())
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn low_stock_lists_only_low_items_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        store.add_equipment(EquipmentDraft::new("Rope", 50, 10)).unwrap();
        let low = store.add_equipment(EquipmentDraft::new("Tarp", 10, 10)).unwrap();
        store.add_equipment(EquipmentDraft::new("Canteen", 14, 10)).unwrap();

        let first: Vec<_> = store.list_low_stock().map(Equipment::id).collect();
        let second: Vec<_> = store.list_low_stock().map(Equipment::id).collect();
        assert_eq!(first, vec![low]);
        assert_eq!(first, second);
    }

    #[test]
    fn file_backend_round_trips_through_close() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        let rope = store
            .add_equipment(EquipmentDraft {
                description: "Nylon, 50 m".to_string(),
                unit: "coil".to_string(),
                location: "Rack 2".to_string(),
                classification: Classification::Restricted,
                ..EquipmentDraft::new("Rope", 8, 2)
            })
            .unwrap();
        let request = store.add_request(request_for(rope, 2)).unwrap();
        store.approve_request(request).unwrap();
        let before_equipment = store.inventory().equipment_records().to_vec();
        let before_requests = store.inventory().requests().to_vec();
        store.close().unwrap();

        let reopened = file_store(tmp.path());
        assert_eq!(reopened.inventory().equipment_records(), before_equipment);
        assert_eq!(reopened.inventory().requests(), before_requests);
        assert!(reopened.inventory().next_equipment_id() > rope);
        assert!(reopened.inventory().next_request_id() > request);
    }

    #[test]
    fn mutations_are_audited() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        let id = store.add_equipment(EquipmentDraft::new("Rope", 8, 2)).unwrap();
        store.update_quantity(id, 3).unwrap();
        store.add_request(request_for(id, 1)).unwrap();
        store.close().unwrap();

        let log = std::fs::read_to_string(tmp.path().join("equipment.log")).unwrap();
        let messages: Vec<_> = log
            .lines()
            .map(|line| line.split_once("] ").unwrap().1)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Added equipment: Rope (ID: 1)",
                "Updated Rope quantity: 8 -> 3",
                "Supply request created: REQ-1 for equipment ID 1",
                "System shutdown",
            ]
        );
    }

    #[test]
    fn failed_backend_write_leaves_memory_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::with_backend(
            tmp.path().to_path_buf(),
            Box::new(Unreachable),
            Limits::default(),
        )
        .unwrap();

        let err = store
            .add_equipment(EquipmentDraft::new("Rope", 8, 2))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert_eq!(store.inventory().equipment_count(), 0);
        assert_eq!(store.inventory().next_equipment_id(), EquipmentId::FIRST);
        assert!(!tmp.path().join("equipment.log").exists());
    }

    #[test]
    fn database_store_writes_through() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("db_config.conf"), "dbname=depot\n").unwrap();
        let config = Config {
            backend: BackendPreference::Database,
            ..Config::default()
        };

        let mut store = Store::open_with_config(tmp.path().to_path_buf(), &config).unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Database);
        let id = store.add_equipment(EquipmentDraft::new("Rope", 8, 2)).unwrap();
        store.update_quantity(id, 1).unwrap();
        // dropped without close: every write already reached the database
        drop(store);

        let reopened = Store::open_with_config(tmp.path().to_path_buf(), &config).unwrap();
        assert_eq!(reopened.find_by_id(id).unwrap().quantity(), 1);
        assert!(!tmp.path().join("equipment.dat").exists());
    }

    #[test]
    fn memory_database_assigns_sequential_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = memory_db_store(tmp.path());
        let first = store.add_equipment(EquipmentDraft::new("Rope", 8, 2)).unwrap();
        let second = store.add_equipment(EquipmentDraft::new("Tarp", 8, 2)).unwrap();
        assert_eq!((first.get(), second.get()), (1, 2));
        assert!(store.find_by_id(second).unwrap().checksum_is_current());
    }

    #[test]
    fn auto_falls_back_to_files_without_db_config() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();

        assert_eq!(store.backend_kind(), BackendKind::FlatFile);
        assert!(matches!(
            store.fallback_reason(),
            Some(BackendError::Config(_))
        ));
    }

    #[test]
    fn required_database_without_config_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            backend: BackendPreference::Database,
            ..Config::default()
        };
        let err = Store::open_with_config(tmp.path().to_path_buf(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[test]
    fn export_report_writes_file_and_audits() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = file_store(tmp.path());
        store.add_equipment(EquipmentDraft::new("Rope", 1, 2)).unwrap();

        let path = store.default_report_path();
        store.export_report(&path).unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        assert!(report.contains("Items requiring resupply: 1"));
        let log = std::fs::read_to_string(tmp.path().join("equipment.log")).unwrap();
        assert!(log.lines().last().unwrap().ends_with("Inventory report exported"));
    }

    #[test_case(StoreError::NameNotFound("x".into()), ErrorKind::NotFound)]
    #[test_case(StoreError::Inventory(InventoryError::IdsExhausted(Table::Requests)), ErrorKind::CapacityExceeded)]
    #[test_case(StoreError::Validation(ValidationError::Empty { field: "name" }), ErrorKind::Validation)]
    #[test_case(
        StoreError::Backend { operation: "save", source: BackendError::io("x", io::ErrorKind::Other.into()) },
        ErrorKind::Io
    )]
    fn error_kinds(error: StoreError, expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }
}
