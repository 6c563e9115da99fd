//! Fixed-width binary encodings for the flat-file backend.
//!
//! Each table file is a [`TableHeader`] followed by `count` records of one
//! fixed width, all encoded with [borsh](https://borsh.io/) (little-endian
//! integers). Text fields are NUL-padded byte arrays one byte longer than the
//! field's bound, so a stored value is always NUL-terminated.

use std::io::{self, Read, Write};

use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};

use crate::domain::{
    Checksum, Classification, Equipment, EquipmentDraft, EquipmentId, Priority, RequestDraft,
    RequestId, RequestStatus, SupplyRequest,
};

/// Count and counter preceding the records in a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TableHeader {
    /// Number of records that follow.
    pub count: u32,
    /// The next identifier to assign.
    pub next_id: u32,
}

impl TableHeader {
    /// Encoded width in bytes.
    pub const WIDTH: usize = 8;
}

/// A record type whose borsh encoding is always the same number of bytes.
pub trait FixedWidth {
    /// Encoded width in bytes.
    const WIDTH: usize;
}

/// A NUL-padded text field of exactly `N` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedText<const N: usize>(String);

impl<const N: usize> FixedText<N> {
    /// Wraps `value`, which must be shorter than `N` bytes.
    pub fn new(value: &str) -> io::Result<Self> {
        if value.len() >= N {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("text of {} bytes does not fit a {N}-byte field", value.len()),
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// The stored text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<const N: usize> BorshSerialize for FixedText<N> {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buffer = [0_u8; N];
        let bytes = self.0.as_bytes();
        let len = bytes.len().min(N - 1);
        buffer[..len].copy_from_slice(&bytes[..len]);
        writer.write_all(&buffer)
    }
}

impl<const N: usize> BorshDeserialize for FixedText<N> {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buffer = [0_u8; N];
        reader.read_exact(&mut buffer)?;
        let end = buffer.iter().position(|&b| b == 0).unwrap_or(N);
        let text = std::str::from_utf8(&buffer[..end])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self(text.to_string()))
    }
}

/// The on-disk shape of an equipment record.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct EquipmentRecord {
    id: u32,
    name: FixedText<64>,
    description: FixedText<256>,
    quantity: u32,
    min_threshold: u32,
    unit: FixedText<32>,
    location: FixedText<64>,
    /// Seconds since the Unix epoch.
    last_updated: i64,
    classification: u8,
    checksum: u16,
}

impl FixedWidth for EquipmentRecord {
    const WIDTH: usize = 4 + 64 + 256 + 4 + 4 + 32 + 64 + 8 + 1 + 2;
}

impl TryFrom<&Equipment> for EquipmentRecord {
    type Error = io::Error;

    fn try_from(item: &Equipment) -> io::Result<Self> {
        Ok(Self {
            id: item.id().get(),
            name: FixedText::new(item.name())?,
            description: FixedText::new(item.description())?,
            quantity: item.quantity(),
            min_threshold: item.min_threshold(),
            unit: FixedText::new(item.unit())?,
            location: FixedText::new(item.location())?,
            last_updated: item.last_updated().timestamp(),
            classification: item.classification().code(),
            checksum: item.checksum().value(),
        })
    }
}

impl TryFrom<EquipmentRecord> for Equipment {
    type Error = String;

    fn try_from(record: EquipmentRecord) -> Result<Self, String> {
        let id = EquipmentId::new(record.id).ok_or("equipment id 0")?;
        let classification =
            Classification::try_from(record.classification).map_err(|e| e.to_string())?;
        let last_updated = timestamp(record.last_updated)?;
        let checksum = Checksum::from_value(record.checksum)
            .ok_or_else(|| format!("checksum {} out of range", record.checksum))?;

        let draft = EquipmentDraft {
            name: record.name.into_inner(),
            description: record.description.into_inner(),
            quantity: record.quantity,
            min_threshold: record.min_threshold,
            unit: record.unit.into_inner(),
            location: record.location.into_inner(),
            classification,
        };
        Self::restore(id, draft, last_updated, checksum)
            .map_err(|e| format!("equipment {id}: {e}"))
    }
}

/// The on-disk shape of a supply request.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RequestRecord {
    id: u32,
    equipment_id: u32,
    requested_qty: u32,
    requesting_unit: FixedText<32>,
    /// Seconds since the Unix epoch.
    request_time: i64,
    status: u8,
    priority: u8,
}

impl FixedWidth for RequestRecord {
    const WIDTH: usize = 4 + 4 + 4 + 32 + 8 + 1 + 1;
}

impl TryFrom<&SupplyRequest> for RequestRecord {
    type Error = io::Error;

    fn try_from(request: &SupplyRequest) -> io::Result<Self> {
        Ok(Self {
            id: request.id().get(),
            equipment_id: request.equipment_id().get(),
            requested_qty: request.requested_qty(),
            requesting_unit: FixedText::new(request.requesting_unit())?,
            request_time: request.request_time().timestamp(),
            status: request.status().code(),
            priority: request.priority().code(),
        })
    }
}

impl TryFrom<RequestRecord> for SupplyRequest {
    type Error = String;

    fn try_from(record: RequestRecord) -> Result<Self, String> {
        let id = RequestId::new(record.id).ok_or("request id 0")?;
        let equipment_id = EquipmentId::new(record.equipment_id)
            .ok_or_else(|| format!("request {id}: equipment id 0"))?;
        let status = RequestStatus::try_from(record.status).map_err(|e| e.to_string())?;
        let priority = Priority::try_from(record.priority).map_err(|e| e.to_string())?;

        let draft = RequestDraft {
            equipment_id,
            requested_qty: record.requested_qty,
            requesting_unit: record.requesting_unit.into_inner(),
            priority,
        };
        Self::restore(id, draft, status, timestamp(record.request_time)?)
            .map_err(|e| format!("request {id}: {e}"))
    }
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| format!("timestamp {seconds} out of range"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Equipment {
        let draft = EquipmentDraft {
            description: "Four-season shelter".to_string(),
            unit: "each".to_string(),
            location: "Bay 3".to_string(),
            classification: Classification::Restricted,
            ..EquipmentDraft::new("Tent, Arctic 10-person", 7, 2)
        };
        Equipment::new(
            EquipmentId::new(12).unwrap(),
            draft,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn equipment_record_has_fixed_width() {
        let long = Equipment::new(
            EquipmentId::FIRST,
            EquipmentDraft {
                description: "d".repeat(255),
                ..EquipmentDraft::new("n".repeat(63), 1, 1)
            },
            Utc.timestamp_opt(0, 0).unwrap(),
        )
        .unwrap();

        for item in [sample(), long] {
            let bytes = borsh::to_vec(&EquipmentRecord::try_from(&item).unwrap()).unwrap();
            assert_eq!(bytes.len(), EquipmentRecord::WIDTH);
        }
    }

    #[test]
    fn equipment_survives_encoding() {
        let item = sample();
        let bytes = borsh::to_vec(&EquipmentRecord::try_from(&item).unwrap()).unwrap();
        let decoded: Equipment = EquipmentRecord::try_from_slice(&bytes)
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn request_record_has_fixed_width() {
        let request = SupplyRequest::new(
            RequestId::new(3).unwrap(),
            RequestDraft {
                equipment_id: EquipmentId::new(12).unwrap(),
                requested_qty: 4,
                requesting_unit: "2nd Platoon".to_string(),
                priority: Priority::Critical,
            },
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
        .unwrap();

        let bytes = borsh::to_vec(&RequestRecord::try_from(&request).unwrap()).unwrap();
        assert_eq!(bytes.len(), RequestRecord::WIDTH);

        let decoded: SupplyRequest = RequestRecord::try_from_slice(&bytes)
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn fixed_text_rejects_overlong_values() {
        assert!(FixedText::<4>::new("abc").is_ok());
        assert!(FixedText::<4>::new("abcd").is_err());
    }

    #[test]
    fn fixed_text_rejects_invalid_utf8() {
        let bytes = [0xff_u8, 0xfe, 0, 0];
        assert!(FixedText::<4>::try_from_slice(&bytes).is_err());
    }

    #[test]
    fn zero_identifier_is_corrupt() {
        let mut bytes = borsh::to_vec(&EquipmentRecord::try_from(&sample()).unwrap()).unwrap();
        bytes[..4].copy_from_slice(&0_u32.to_le_bytes());
        let record = EquipmentRecord::try_from_slice(&bytes).unwrap();
        assert!(Equipment::try_from(record).is_err());
    }

    #[test]
    fn header_width_matches_encoding() {
        let header = TableHeader {
            count: 2,
            next_id: 9,
        };
        assert_eq!(borsh::to_vec(&header).unwrap().len(), TableHeader::WIDTH);
    }
}
