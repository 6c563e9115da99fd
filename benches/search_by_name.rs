//! Name lookups against a full inventory, both when the name index hits and
//! when the query forces the full scan.

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion};
use quartermaster::{domain::Limits, EquipmentDraft, Inventory, Store};
use std::hint::black_box;
use tempfile::TempDir;

fn seeded_store(tmp_dir: &TempDir) -> Store {
    let mut store = Store::with_backend(
        tmp_dir.path().to_path_buf(),
        Box::new(quartermaster::storage::FlatFileBackend::new(tmp_dir.path())),
        Limits::default(),
    )
    .unwrap();
    for i in 0..999 {
        store
            .add_equipment(EquipmentDraft::new(format!("Ration pack {i:03}"), 50, 10))
            .unwrap();
    }
    store
        .add_equipment(EquipmentDraft::new("Tent, Arctic 10-person", 4, 1))
        .unwrap();
    store
}

fn search_by_name(c: &mut Criterion) {
    let tmp_dir = TempDir::new().unwrap();
    let store = seeded_store(&tmp_dir);
    let inventory: &Inventory = store.inventory();

    c.bench_function("search exact name (index hit)", |b| {
        b.iter(|| inventory.search_by_name(black_box("Tent, Arctic 10-person")));
    });

    c.bench_function("search partial name (full scan)", |b| {
        b.iter(|| inventory.search_by_name(black_box("arctic")));
    });
}

criterion_group!(benches, search_by_name);
criterion_main!(benches);
