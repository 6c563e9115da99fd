//! The buffering flat-file backend.
//!
//! Mutations are held in memory by the store and written out in one bulk
//! [`Backend::save`]. Identifiers are always assigned locally.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    domain::{Equipment, EquipmentId, RequestId, Snapshot, SnapshotRef, SupplyRequest},
    storage::{
        backend::{Backend, BackendError, BackendKind},
        record::{EquipmentRecord, FixedWidth, RequestRecord, TableHeader},
    },
};

/// File holding the equipment table.
pub const EQUIPMENT_FILE: &str = "equipment.dat";
/// File holding the supply request table.
pub const REQUESTS_FILE: &str = "requests.dat";

/// Equipment and supply requests stored as two fixed-width binary files.
#[derive(Debug, Clone)]
pub struct FlatFileBackend {
    equipment_path: PathBuf,
    requests_path: PathBuf,
}

impl FlatFileBackend {
    /// A backend storing its tables under `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            equipment_path: root.join(EQUIPMENT_FILE),
            requests_path: root.join(REQUESTS_FILE),
        }
    }
}

impl Backend for FlatFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::FlatFile
    }

    fn load(&mut self) -> Result<Snapshot, BackendError> {
        let (equipment, next_equipment_id) =
            read_table::<EquipmentRecord, Equipment>(&self.equipment_path)?;
        let (requests, next_request_id) =
            read_table::<RequestRecord, SupplyRequest>(&self.requests_path)?;

        tracing::info!(
            equipment = equipment.len(),
            requests = requests.len(),
            "loaded inventory from local files"
        );

        Ok(Snapshot {
            equipment,
            requests,
            next_equipment_id: next_equipment_id.and_then(EquipmentId::new),
            next_request_id: next_request_id.and_then(RequestId::new),
        })
    }

    fn insert_equipment(&mut self, _item: &mut Equipment) -> Result<(), BackendError> {
        Ok(())
    }

    fn update_equipment(&mut self, _item: &Equipment) -> Result<(), BackendError> {
        Ok(())
    }

    fn insert_request(&mut self, _request: &mut SupplyRequest) -> Result<(), BackendError> {
        Ok(())
    }

    fn update_request(&mut self, _request: &SupplyRequest) -> Result<(), BackendError> {
        Ok(())
    }

    fn save(&mut self, snapshot: SnapshotRef<'_>) -> Result<(), BackendError> {
        write_table(
            &self.equipment_path,
            snapshot.next_equipment_id.get(),
            snapshot.equipment,
            |item| EquipmentRecord::try_from(item),
        )?;
        write_table(
            &self.requests_path,
            snapshot.next_request_id.get(),
            snapshot.requests,
            |request| RequestRecord::try_from(request),
        )?;
        tracing::info!(
            equipment = snapshot.equipment.len(),
            requests = snapshot.requests.len(),
            "saved inventory to local files"
        );
        Ok(())
    }
}

/// Reads one table file. A missing file is an empty table.
fn read_table<R, T>(path: &Path) -> Result<(Vec<T>, Option<u32>), BackendError>
where
    R: BorshDeserialize + FixedWidth,
    T: TryFrom<R, Error = String>,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no table file, starting empty");
            return Ok((Vec::new(), None));
        }
        Err(e) => return Err(BackendError::io(path, e)),
    };
    let file_len = file.metadata().map_err(|e| BackendError::io(path, e))?.len();
    let mut reader = BufReader::new(file);
    let corrupt = |reason: String| BackendError::corrupt(path.display(), reason);

    let header = TableHeader::deserialize_reader(&mut reader)
        .map_err(|e| corrupt(format!("unreadable header: {e}")))?;

    // The header count is untrusted until the file is long enough to hold it.
    let available = usize::try_from(file_len)
        .unwrap_or(usize::MAX)
        .saturating_sub(TableHeader::WIDTH)
        / R::WIDTH;
    let count = usize::try_from(header.count).unwrap_or(usize::MAX);
    if count > available {
        return Err(corrupt(format!(
            "header claims {} records but the file holds at most {available}",
            header.count
        )));
    }

    let mut rows = Vec::with_capacity(count);
    for index in 0..header.count {
        let record = R::deserialize_reader(&mut reader)
            .map_err(|e| corrupt(format!("record {index} of {}: {e}", header.count)))?;
        rows.push(T::try_from(record).map_err(corrupt)?);
    }

    let mut trailing = [0_u8; 1];
    if reader
        .read(&mut trailing)
        .map_err(|e| BackendError::io(path, e))?
        > 0
    {
        tracing::warn!(path = %path.display(), "ignoring trailing bytes after the last record");
    }

    Ok((rows, Some(header.next_id)))
}

/// Writes one table file atomically: the data goes to a sibling `.tmp` file
/// that is synced and renamed over the target.
fn write_table<T, R, F>(path: &Path, next_id: u32, rows: &[T], encode: F) -> Result<(), BackendError>
where
    R: BorshSerialize,
    F: Fn(&T) -> std::io::Result<R>,
{
    let tmp_path = path.with_extension("tmp");
    let io_err = |e: std::io::Error| BackendError::io(&tmp_path, e);

    let count = u32::try_from(rows.len())
        .map_err(|_| BackendError::corrupt(path.display(), "too many records to encode"))?;

    let file = File::create(&tmp_path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    borsh::to_writer(&mut writer, &TableHeader { count, next_id }).map_err(io_err)?;
    for row in rows {
        borsh::to_writer(&mut writer, &encode(row).map_err(io_err)?).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| BackendError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{EquipmentDraft, Priority, RequestDraft, RequestStatus};

    fn item(id: u32, name: &str) -> Equipment {
        Equipment::new(
            EquipmentId::new(id).unwrap(),
            EquipmentDraft {
                unit: "each".to_string(),
                location: "Cage B".to_string(),
                ..EquipmentDraft::new(name, 12, 4)
            },
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
        .unwrap()
    }

    fn request(id: u32, equipment: u32) -> SupplyRequest {
        let mut request = SupplyRequest::new(
            RequestId::new(id).unwrap(),
            RequestDraft {
                equipment_id: EquipmentId::new(equipment).unwrap(),
                requested_qty: 2,
                requesting_unit: "Alpha Coy".to_string(),
                priority: Priority::High,
            },
            Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        )
        .unwrap();
        request.transition(RequestStatus::Approved).unwrap();
        request
    }

    #[test]
    fn missing_files_load_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = FlatFileBackend::new(tmp.path()).load().unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn save_then_load_reproduces_records() {
        let tmp = tempfile::tempdir().unwrap();
        let mut backend = FlatFileBackend::new(tmp.path());
        let equipment = vec![item(1, "Rope"), item(5, "Tent, Arctic 10-person")];
        let requests = vec![request(2, 5)];

        backend
            .save(SnapshotRef {
                equipment: &equipment,
                requests: &requests,
                next_equipment_id: EquipmentId::new(6).unwrap(),
                next_request_id: RequestId::new(3).unwrap(),
            })
            .unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.equipment, equipment);
        assert_eq!(loaded.requests, requests);
        assert_eq!(loaded.next_equipment_id, EquipmentId::new(6));
        assert_eq!(loaded.next_request_id, RequestId::new(3));
        assert!(!tmp.path().join("equipment.tmp").exists());
    }

    #[test]
    fn file_layout_is_header_then_fixed_records() {
        let tmp = tempfile::tempdir().unwrap();
        let mut backend = FlatFileBackend::new(tmp.path());
        let equipment = vec![item(1, "Rope"), item(2, "Tarp")];

        backend
            .save(SnapshotRef {
                equipment: &equipment,
                requests: &[],
                next_equipment_id: EquipmentId::new(3).unwrap(),
                next_request_id: RequestId::FIRST,
            })
            .unwrap();

        let bytes = fs::read(tmp.path().join(EQUIPMENT_FILE)).unwrap();
        assert_eq!(bytes.len(), TableHeader::WIDTH + 2 * EquipmentRecord::WIDTH);
        assert_eq!(bytes[..4], 2_u32.to_le_bytes());
        assert_eq!(bytes[4..8], 3_u32.to_le_bytes());

        let requests = fs::read(tmp.path().join(REQUESTS_FILE)).unwrap();
        assert_eq!(requests.len(), TableHeader::WIDTH);
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let mut backend = FlatFileBackend::new(tmp.path());
        let equipment = vec![item(1, "Rope")];
        backend
            .save(SnapshotRef {
                equipment: &equipment,
                requests: &[],
                next_equipment_id: EquipmentId::new(2).unwrap(),
                next_request_id: RequestId::FIRST,
            })
            .unwrap();

        let path = tmp.path().join(EQUIPMENT_FILE);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

        assert!(matches!(
            backend.load(),
            Err(BackendError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversized_header_count_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let header = borsh::to_vec(&TableHeader {
            count: u32::MAX,
            next_id: 1,
        })
        .unwrap();
        fs::write(tmp.path().join(EQUIPMENT_FILE), header).unwrap();

        assert!(matches!(
            FlatFileBackend::new(tmp.path()).load(),
            Err(BackendError::Corrupt { .. })
        ));
    }

    #[test]
    fn zero_counter_is_treated_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let header = borsh::to_vec(&TableHeader {
            count: 0,
            next_id: 0,
        })
        .unwrap();
        fs::write(tmp.path().join(EQUIPMENT_FILE), header).unwrap();

        let snapshot = FlatFileBackend::new(tmp.path()).load().unwrap();
        assert!(snapshot.next_equipment_id.is_none());
    }
}
