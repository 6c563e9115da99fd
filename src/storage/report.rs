//! Plain-text inventory report.

use std::io::{self, Write};

use chrono::{DateTime, Local};

use crate::{
    domain::Inventory,
    storage::BackendKind,
};

/// Default report file name under the inventory root.
pub const REPORT_FILE: &str = "inventory_report.txt";

/// Writes a summary of `inventory` to `out`.
///
/// The report is write-once: nothing in the crate reads it back.
///
/// # Errors
///
/// Fails if `out` cannot be written.
pub fn write_report<W: Write>(
    out: &mut W,
    inventory: &Inventory,
    source: BackendKind,
    generated: DateTime<Local>,
) -> io::Result<()> {
    writeln!(out, "TACTICAL SUPPLY INVENTORY REPORT")?;
    writeln!(out, "Generated: {}", generated.format("%a %b %e %H:%M:%S %Y"))?;
    writeln!(out, "Data Source: {}", source.data_source())?;
    writeln!(out, "================================")?;
    writeln!(out)?;

    writeln!(out, "INVENTORY SUMMARY:")?;
    writeln!(out, "Total Items: {}", inventory.equipment_count())?;
    writeln!(
        out,
        "Items requiring resupply: {}",
        inventory.low_stock().count()
    )?;
    writeln!(out)?;

    writeln!(out, "DETAILED INVENTORY:")?;
    for item in inventory.equipment_records() {
        writeln!(
            out,
            "ID: {} | {} | Qty: {} {} | Location: {} | Status: {} | Class: {}",
            item.id(),
            item.name(),
            item.quantity(),
            item.unit(),
            item.location(),
            item.stock_status(),
            item.classification(),
        )?;
    }
    writeln!(out)?;

    writeln!(out, "SUPPLY REQUESTS:")?;
    if inventory.requests().is_empty() {
        writeln!(out, "None")?;
    }
    for request in inventory.requests() {
        writeln!(
            out,
            "{} | Equipment ID: {} | Qty: {} | Unit: {} | Priority: {} | Status: {}",
            request.id(),
            request.equipment_id(),
            request.requested_qty(),
            request.requesting_unit(),
            request.priority(),
            request.status(),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{
        Classification, Equipment, EquipmentDraft, EquipmentId, Priority, RequestDraft, RequestId,
        SupplyRequest,
    };

    #[test]
    fn report_lists_every_record() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut inventory = Inventory::default();
        inventory
            .insert_equipment(
                Equipment::new(
                    EquipmentId::FIRST,
                    EquipmentDraft {
                        unit: "each".to_string(),
                        location: "Bay 3".to_string(),
                        classification: Classification::Secret,
                        ..EquipmentDraft::new("Night Vision Goggles", 2, 4)
                    },
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        inventory
            .insert_request(
                SupplyRequest::new(
                    RequestId::FIRST,
                    RequestDraft {
                        equipment_id: EquipmentId::FIRST,
                        requested_qty: 6,
                        requesting_unit: "Recon".to_string(),
                        priority: Priority::High,
                    },
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        let generated = Local.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        let mut out = Vec::new();
        write_report(&mut out, &inventory, BackendKind::FlatFile, generated).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("TACTICAL SUPPLY INVENTORY REPORT\n"));
        assert!(text.contains("Generated: Mon Jan 15 08:30:00 2024\n"));
        assert!(text.contains("Data Source: Local Files\n"));
        assert!(text.contains("Total Items: 1\n"));
        assert!(text.contains("Items requiring resupply: 1\n"));
        assert!(text.contains(
            "ID: 1 | Night Vision Goggles | Qty: 2 each | Location: Bay 3 | Status: LOW | Class: SECRET\n"
        ));
        assert!(text.contains(
            "REQ-1 | Equipment ID: 1 | Qty: 6 | Unit: Recon | Priority: HIGH | Status: PENDING\n"
        ));
    }

    #[test]
    fn empty_inventory_still_has_every_section() {
        let mut out = Vec::new();
        write_report(
            &mut out,
            &Inventory::default(),
            BackendKind::Database,
            Local::now(),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Data Source: SQLite Database\n"));
        assert!(text.contains("Total Items: 0\n"));
        assert!(text.contains("DETAILED INVENTORY:\n"));
        assert!(text.contains("SUPPLY REQUESTS:\nNone\n"));
    }
}
