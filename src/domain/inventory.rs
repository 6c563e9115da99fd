//! In-memory tables of equipment and supply requests.
//!
//! The [`Inventory`] knows nothing about files or databases. It owns both
//! collections, both identifier counters and the name index, and enforces the
//! invariants that hold between them.

use std::{collections::HashMap, fmt};

use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    name_index::{contains_folded, NameIndex},
    Equipment, EquipmentId, RequestId, StockStatus, SupplyRequest,
};

/// Maximum number of records each table may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Capacity of the equipment table.
    pub max_equipment: usize,
    /// Capacity of the supply request table.
    pub max_requests: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_equipment: 1000,
            max_requests: 500,
        }
    }
}

/// One of the two record tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// The equipment table.
    Equipment,
    /// The supply request table.
    Requests,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equipment => "equipment",
            Self::Requests => "supply request",
        })
    }
}

/// Errors raised by the in-memory tables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// The table is full.
    #[error("{table} table is full ({limit} records)")]
    CapacityExceeded {
        /// Which table.
        table: Table,
        /// Its configured capacity.
        limit: usize,
    },
    /// The identifier counter cannot advance any further.
    #[error("{0} identifiers are exhausted")]
    IdsExhausted(Table),
    /// An equipment identifier is already taken.
    #[error("duplicate equipment identifier {0}")]
    DuplicateEquipment(EquipmentId),
    /// A request identifier is already taken.
    #[error("duplicate supply request identifier {0}")]
    DuplicateRequest(RequestId),
    /// Replacement of a record that was never inserted.
    #[error("equipment {0} is not in the inventory")]
    UnknownEquipment(EquipmentId),
    /// Replacement of a request that was never inserted.
    #[error("supply request {0} is not in the inventory")]
    UnknownRequest(RequestId),
}

/// The persisted shape of an inventory, as returned by a backend's load.
///
/// The counters are `None` when the backend does not record them, in which
/// case they are derived from the highest loaded identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Equipment records in insertion order.
    pub equipment: Vec<Equipment>,
    /// Supply requests in insertion order.
    pub requests: Vec<SupplyRequest>,
    /// The stored next equipment identifier, if any.
    pub next_equipment_id: Option<EquipmentId>,
    /// The stored next request identifier, if any.
    pub next_request_id: Option<RequestId>,
}

/// A borrowed view of the full inventory state, as handed to a backend's
/// save.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRef<'a> {
    /// Equipment records in insertion order.
    pub equipment: &'a [Equipment],
    /// Supply requests in insertion order.
    pub requests: &'a [SupplyRequest],
    /// The next equipment identifier the inventory would assign.
    pub next_equipment_id: EquipmentId,
    /// The next request identifier the inventory would assign.
    pub next_request_id: RequestId,
}

/// An in-memory representation of the inventory.
///
/// Records are kept in insertion order in plain vectors, with a slot map from
/// identifier to position. Nothing is ever removed, so slots never move.
/// - Equipment: `Vec<Equipment>` + `HashMap<EquipmentId, usize>`
/// - Requests: `Vec<SupplyRequest>` + `HashMap<RequestId, usize>`
/// - Names: [`NameIndex`] of identifiers
#[derive(Debug, Clone)]
pub struct Inventory {
    equipment: Vec<Equipment>,
    equipment_slots: HashMap<EquipmentId, usize>,

    requests: Vec<SupplyRequest>,
    request_slots: HashMap<RequestId, usize>,

    /// Accelerates name lookups. Never the source of truth.
    names: NameIndex,

    /// Always strictly greater than every equipment identifier seen.
    next_equipment_id: EquipmentId,
    /// Always strictly greater than every request identifier seen.
    next_request_id: RequestId,

    limits: Limits,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Inventory {
    /// Creates an empty inventory with the given table capacities.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            equipment: Vec::new(),
            equipment_slots: HashMap::new(),
            requests: Vec::new(),
            request_slots: HashMap::new(),
            names: NameIndex::new(),
            next_equipment_id: EquipmentId::FIRST,
            next_request_id: RequestId::FIRST,
            limits,
        }
    }

    /// Populates an inventory from loaded state and rebuilds the name index.
    ///
    /// Both counters end up strictly greater than any loaded identifier and
    /// no lower than the stored counters. Loaded state that exceeds the
    /// configured capacity is kept in full; only further inserts are refused.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot contains duplicate identifiers.
    #[instrument(skip_all, fields(equipment = snapshot.equipment.len(), requests = snapshot.requests.len()))]
    pub fn from_snapshot(snapshot: Snapshot, limits: Limits) -> Result<Self, InventoryError> {
        let mut inventory = Self::new(limits);
        inventory.equipment.reserve(snapshot.equipment.len());
        inventory.requests.reserve(snapshot.requests.len());

        for item in snapshot.equipment {
            if !item.checksum_is_current() {
                tracing::warn!(id = %item.id(), "stored checksum does not match record fields");
            }
            inventory.push_equipment(item)?;
        }
        for request in snapshot.requests {
            inventory.push_request(request)?;
        }

        if let Some(next) = snapshot.next_equipment_id {
            inventory.next_equipment_id = inventory.next_equipment_id.max(next);
        }
        if let Some(next) = snapshot.next_request_id {
            inventory.next_request_id = inventory.next_request_id.max(next);
        }

        if inventory.equipment.len() > limits.max_equipment {
            tracing::warn!(
                loaded = inventory.equipment.len(),
                limit = limits.max_equipment,
                "loaded more equipment than the configured capacity"
            );
        }
        if inventory.requests.len() > limits.max_requests {
            tracing::warn!(
                loaded = inventory.requests.len(),
                limit = limits.max_requests,
                "loaded more supply requests than the configured capacity"
            );
        }

        Ok(inventory)
    }

    /// The table capacities.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// The identifier the next locally assigned equipment record will get.
    #[must_use]
    pub const fn next_equipment_id(&self) -> EquipmentId {
        self.next_equipment_id
    }

    /// The identifier the next locally assigned supply request will get.
    #[must_use]
    pub const fn next_request_id(&self) -> RequestId {
        self.next_request_id
    }

    /// Fails if another equipment record would exceed capacity.
    ///
    /// # Errors
    ///
    /// [`InventoryError::CapacityExceeded`] when the table is full.
    pub fn ensure_equipment_capacity(&self) -> Result<(), InventoryError> {
        if self.equipment.len() >= self.limits.max_equipment {
            return Err(InventoryError::CapacityExceeded {
                table: Table::Equipment,
                limit: self.limits.max_equipment,
            });
        }
        Ok(())
    }

    /// Fails if another supply request would exceed capacity.
    ///
    /// # Errors
    ///
    /// [`InventoryError::CapacityExceeded`] when the table is full.
    pub fn ensure_request_capacity(&self) -> Result<(), InventoryError> {
        if self.requests.len() >= self.limits.max_requests {
            return Err(InventoryError::CapacityExceeded {
                table: Table::Requests,
                limit: self.limits.max_requests,
            });
        }
        Ok(())
    }

    /// Inserts a new equipment record and files it in the name index.
    ///
    /// The counter is advanced past the record's identifier, which may have
    /// been assigned elsewhere (e.g. by a database).
    ///
    /// # Errors
    ///
    /// Fails when the table is full or the identifier is already taken.
    pub fn insert_equipment(&mut self, item: Equipment) -> Result<EquipmentId, InventoryError> {
        self.ensure_equipment_capacity()?;
        self.push_equipment(item)
    }

    fn push_equipment(&mut self, item: Equipment) -> Result<EquipmentId, InventoryError> {
        let id = item.id();
        if self.equipment_slots.contains_key(&id) {
            return Err(InventoryError::DuplicateEquipment(id));
        }
        let next = id
            .successor()
            .ok_or(InventoryError::IdsExhausted(Table::Equipment))?;

        self.names.insert(&item);
        self.equipment_slots.insert(id, self.equipment.len());
        self.equipment.push(item);
        self.next_equipment_id = self.next_equipment_id.max(next);
        Ok(id)
    }

    /// Inserts a new supply request.
    ///
    /// # Errors
    ///
    /// Fails when the table is full or the identifier is already taken.
    pub fn insert_request(&mut self, request: SupplyRequest) -> Result<RequestId, InventoryError> {
        self.ensure_request_capacity()?;
        self.push_request(request)
    }

    fn push_request(&mut self, request: SupplyRequest) -> Result<RequestId, InventoryError> {
        let id = request.id();
        if self.request_slots.contains_key(&id) {
            return Err(InventoryError::DuplicateRequest(id));
        }
        let next = id
            .successor()
            .ok_or(InventoryError::IdsExhausted(Table::Requests))?;

        self.request_slots.insert(id, self.requests.len());
        self.requests.push(request);
        self.next_request_id = self.next_request_id.max(next);
        Ok(id)
    }

    /// Overwrites an existing equipment record in place.
    ///
    /// Names are immutable, so the name index is left alone.
    pub(crate) fn replace_equipment(&mut self, item: Equipment) -> Result<(), InventoryError> {
        let slot = *self
            .equipment_slots
            .get(&item.id())
            .ok_or(InventoryError::UnknownEquipment(item.id()))?;
        debug_assert_eq!(self.equipment[slot].name(), item.name());
        self.equipment[slot] = item;
        Ok(())
    }

    /// Overwrites an existing supply request in place.
    pub(crate) fn replace_request(&mut self, request: SupplyRequest) -> Result<(), InventoryError> {
        let slot = *self
            .request_slots
            .get(&request.id())
            .ok_or(InventoryError::UnknownRequest(request.id()))?;
        self.requests[slot] = request;
        Ok(())
    }

    /// Looks up an equipment record by identifier.
    #[must_use]
    pub fn equipment(&self, id: EquipmentId) -> Option<&Equipment> {
        self.equipment_slots.get(&id).map(|&slot| &self.equipment[slot])
    }

    /// Looks up a supply request by identifier.
    #[must_use]
    pub fn request(&self, id: RequestId) -> Option<&SupplyRequest> {
        self.request_slots.get(&id).map(|&slot| &self.requests[slot])
    }

    /// Finds the first record whose name contains `query`, ignoring case.
    ///
    /// Tries the name index first and falls back to a full scan in insertion
    /// order, so a match is found whichever bucket it was filed under.
    #[must_use]
    pub fn search_by_name(&self, query: &str) -> Option<&Equipment> {
        if let Some(hit) = self.names.find(query, |id| self.equipment(id)) {
            tracing::trace!(id = %hit.id(), "name index hit");
            return Some(hit);
        }
        tracing::trace!("name index miss, scanning");
        self.matching_name(query).next()
    }

    /// Every record whose name contains `query`, ignoring case, in insertion
    /// order.
    pub fn matching_name<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Equipment> + 'a {
        let needle = query.to_lowercase();
        self.equipment
            .iter()
            .filter(move |item| contains_folded(item.name(), &needle))
    }

    /// Records whose stock status is [`StockStatus::Low`], in insertion
    /// order. Recomputed on every call.
    pub fn low_stock(&self) -> impl Iterator<Item = &Equipment> + '_ {
        self.equipment
            .iter()
            .filter(|item| item.stock_status() == StockStatus::Low)
    }

    /// All equipment records in insertion order.
    #[must_use]
    pub fn equipment_records(&self) -> &[Equipment] {
        &self.equipment
    }

    /// All supply requests in insertion order.
    #[must_use]
    pub fn requests(&self) -> &[SupplyRequest] {
        &self.requests
    }

    /// Number of equipment records.
    #[must_use]
    pub fn equipment_count(&self) -> usize {
        self.equipment.len()
    }

    /// Number of supply requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// A borrowed view of the full state, for a bulk save.
    #[must_use]
    pub fn as_snapshot(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            equipment: &self.equipment,
            requests: &self.requests,
            next_equipment_id: self.next_equipment_id,
            next_request_id: self.next_request_id,
        }
    }
}
