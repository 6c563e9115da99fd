//! The write-through relational backend, on an embedded SQLite database.
//!
//! Every statement binds its values as parameters. Identifiers are assigned
//! by the database (`AUTOINCREMENT`) and adopted by the caller's record.

use std::path::Path;

use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::{
    domain::{
        Checksum, Classification, Equipment, EquipmentDraft, EquipmentId, Priority, RequestDraft,
        RequestId, RequestStatus, Snapshot, SnapshotRef, SupplyRequest,
    },
    storage::{
        backend::{Backend, BackendError, BackendKind},
        db_config::DbConfig,
    },
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    quantity INTEGER NOT NULL,
    min_threshold INTEGER NOT NULL,
    unit TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    classification INTEGER NOT NULL DEFAULT 0,
    checksum TEXT NOT NULL,
    last_updated INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS supply_requests (
    req_id INTEGER PRIMARY KEY AUTOINCREMENT,
    equipment_id INTEGER NOT NULL REFERENCES equipment(id),
    requested_qty INTEGER NOT NULL,
    requesting_unit TEXT NOT NULL,
    request_time INTEGER NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 2
);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    user_info TEXT NOT NULL,
    timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);";

/// Actor recorded against every audit row.
const AUDIT_USER: &str = "system";

/// Equipment and supply requests stored in an embedded SQLite database.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens the database selected by a connection file, resolved against
    /// `root`.
    ///
    /// # Errors
    ///
    /// Fails if the connection file is missing or malformed, or the database
    /// cannot be opened.
    pub fn from_config(root: &Path, config_path: &Path) -> Result<Self, BackendError> {
        let config = DbConfig::load(config_path)?;
        tracing::debug!(?config, "loaded database config");
        Self::open(&config.database_path(root))
    }

    /// Opens (creating if needed) a database file and ensures the schema.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened as a database.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened database");
        Self::with_connection(conn)
    }

    /// An in-memory database, discarded when dropped.
    ///
    /// # Errors
    ///
    /// Fails if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, BackendError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn load_equipment(&self) -> Result<Vec<Equipment>, BackendError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, quantity, min_threshold, unit, location,
                    classification, checksum, last_updated
             FROM equipment ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(EquipmentRow {
                id: row.get(0)?,
                draft: EquipmentDraft {
                    name: row.get(1)?,
                    description: row.get(2)?,
                    quantity: row.get(3)?,
                    min_threshold: row.get(4)?,
                    unit: row.get(5)?,
                    location: row.get(6)?,
                    classification: Classification::default(),
                },
                classification: row.get(7)?,
                checksum: row.get(8)?,
                last_updated: row.get(9)?,
            })
        })?;

        let mut equipment = Vec::new();
        for row in rows {
            equipment.push(row?.into_equipment()?);
        }
        Ok(equipment)
    }

    fn load_requests(&self) -> Result<Vec<SupplyRequest>, BackendError> {
        let mut stmt = self.conn.prepare(
            "SELECT req_id, equipment_id, requested_qty, requesting_unit, request_time,
                    status, priority
             FROM supply_requests ORDER BY req_id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RequestRow {
                id: row.get(0)?,
                equipment_id: row.get(1)?,
                requested_qty: row.get(2)?,
                requesting_unit: row.get(3)?,
                request_time: row.get(4)?,
                status: row.get(5)?,
                priority: row.get(6)?,
            })
        })?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?.into_request()?);
        }
        Ok(requests)
    }

    /// The next identifier `AUTOINCREMENT` would hand out for `table`, if it
    /// has handed out any.
    fn next_sequence(&self, table: &str) -> Result<Option<u32>, BackendError> {
        let seq: Option<i64> = self
            .conn
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(seq
            .and_then(|seq| seq.checked_add(1))
            .and_then(|next| u32::try_from(next).ok()))
    }
}

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    fn load(&mut self) -> Result<Snapshot, BackendError> {
        let equipment = self.load_equipment()?;
        let requests = self.load_requests()?;
        tracing::info!(
            equipment = equipment.len(),
            requests = requests.len(),
            "loaded inventory from database"
        );

        Ok(Snapshot {
            equipment,
            requests,
            next_equipment_id: self.next_sequence("equipment")?.and_then(EquipmentId::new),
            next_request_id: self.next_sequence("supply_requests")?.and_then(RequestId::new),
        })
    }

    fn insert_equipment(&mut self, item: &mut Equipment) -> Result<(), BackendError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO equipment (name, description, quantity, min_threshold, unit, location,
                                    classification, checksum, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.name(),
                item.description(),
                item.quantity(),
                item.min_threshold(),
                item.unit(),
                item.location(),
                item.classification().code(),
                item.checksum().to_string(),
                item.last_updated().timestamp(),
            ],
        )?;

        let assigned = assigned_id(&tx, "equipment")?;
        if let Some(id) = EquipmentId::new(assigned).filter(|&id| id != item.id()) {
            tracing::debug!(candidate = %item.id(), assigned = %id, "database assigned a different equipment id");
            item.reassign_id(id);
            tx.execute(
                "UPDATE equipment SET checksum = ?1 WHERE id = ?2",
                params![item.checksum().to_string(), id.get()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_equipment(&mut self, item: &Equipment) -> Result<(), BackendError> {
        let changed = self.conn.execute(
            "UPDATE equipment SET quantity = ?1, checksum = ?2, last_updated = ?3 WHERE id = ?4",
            params![
                item.quantity(),
                item.checksum().to_string(),
                item.last_updated().timestamp(),
                item.id().get(),
            ],
        )?;
        if changed == 0 {
            return Err(BackendError::MissingRow {
                table: "equipment",
                id: item.id().get(),
            });
        }
        Ok(())
    }

    fn insert_request(&mut self, request: &mut SupplyRequest) -> Result<(), BackendError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO supply_requests (equipment_id, requested_qty, requesting_unit,
                                          request_time, status, priority)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.equipment_id().get(),
                request.requested_qty(),
                request.requesting_unit(),
                request.request_time().timestamp(),
                request.status().code(),
                request.priority().code(),
            ],
        )?;

        let assigned = assigned_id(&tx, "supply_requests")?;
        if let Some(id) = RequestId::new(assigned).filter(|&id| id != request.id()) {
            tracing::debug!(candidate = %request.id(), assigned = %id, "database assigned a different request id");
            request.reassign_id(id);
        }
        tx.commit()?;
        Ok(())
    }

    fn update_request(&mut self, request: &SupplyRequest) -> Result<(), BackendError> {
        let changed = self.conn.execute(
            "UPDATE supply_requests SET status = ?1 WHERE req_id = ?2",
            params![request.status().code(), request.id().get()],
        )?;
        if changed == 0 {
            return Err(BackendError::MissingRow {
                table: "supply_requests",
                id: request.id().get(),
            });
        }
        Ok(())
    }

    fn record_audit(&mut self, message: &str) -> Result<(), BackendError> {
        self.conn.execute(
            "INSERT INTO audit_log (action, user_info) VALUES (?1, ?2)",
            params![message, AUDIT_USER],
        )?;
        Ok(())
    }

    fn save(&mut self, _snapshot: SnapshotRef<'_>) -> Result<(), BackendError> {
        tracing::trace!("database writes through; nothing to save");
        Ok(())
    }
}

fn assigned_id(tx: &Transaction<'_>, table: &str) -> Result<u32, BackendError> {
    let rowid = tx.last_insert_rowid();
    u32::try_from(rowid)
        .map_err(|_| BackendError::corrupt(format!("{table} table"), format!("row id {rowid} out of range")))
}

struct EquipmentRow {
    id: u32,
    draft: EquipmentDraft,
    classification: u8,
    checksum: String,
    last_updated: i64,
}

impl EquipmentRow {
    fn into_equipment(self) -> Result<Equipment, BackendError> {
        let corrupt = |reason: String| BackendError::corrupt("equipment table", reason);

        let id = EquipmentId::new(self.id).ok_or_else(|| corrupt("equipment id 0".to_string()))?;
        let classification =
            Classification::try_from(self.classification).map_err(|e| corrupt(e.to_string()))?;
        let checksum: Checksum = self
            .checksum
            .parse()
            .map_err(|e: crate::domain::ParseCodeError| corrupt(format!("equipment {id}: {e}")))?;
        let last_updated = DateTime::from_timestamp(self.last_updated, 0)
            .ok_or_else(|| corrupt(format!("equipment {id}: timestamp out of range")))?;

        let draft = EquipmentDraft {
            classification,
            ..self.draft
        };
        Equipment::restore(id, draft, last_updated, checksum)
            .map_err(|e| corrupt(format!("equipment {id}: {e}")))
    }
}

struct RequestRow {
    id: u32,
    equipment_id: u32,
    requested_qty: u32,
    requesting_unit: String,
    request_time: i64,
    status: u8,
    priority: u8,
}

impl RequestRow {
    fn into_request(self) -> Result<SupplyRequest, BackendError> {
        let corrupt = |reason: String| BackendError::corrupt("supply_requests table", reason);

        let id = RequestId::new(self.id).ok_or_else(|| corrupt("request id 0".to_string()))?;
        let equipment_id = EquipmentId::new(self.equipment_id)
            .ok_or_else(|| corrupt(format!("request {id}: equipment id 0")))?;
        let status = RequestStatus::try_from(self.status).map_err(|e| corrupt(e.to_string()))?;
        let priority = Priority::try_from(self.priority).map_err(|e| corrupt(e.to_string()))?;
        let request_time = DateTime::from_timestamp(self.request_time, 0)
            .ok_or_else(|| corrupt(format!("request {id}: timestamp out of range")))?;

        let draft = RequestDraft {
            equipment_id,
            requested_qty: self.requested_qty,
            requesting_unit: self.requesting_unit,
            priority,
        };
        SupplyRequest::restore(id, draft, status, request_time)
            .map_err(|e| corrupt(format!("request {id}: {e}")))
    }
}
