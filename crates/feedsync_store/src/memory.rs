//! In-memory store.

use crate::error::{StoreError, StoreResult};
use crate::kind::EntityKind;
use crate::record::{FieldValue, Record, StoredRecord};
use crate::store::Store;
use crate::types::{LocalId, NaturalKey};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    rows: BTreeMap<LocalId, (NaturalKey, Record)>,
    index: HashMap<NaturalKey, LocalId>,
}

impl Table {
    fn stored(&self, id: LocalId) -> Option<StoredRecord> {
        self.rows.get(&id).map(|(key, record)| StoredRecord {
            id,
            key: key.clone(),
            record: record.clone(),
        })
    }
}

/// An in-memory store.
///
/// This store keeps every table in memory and is suitable for:
/// - Unit and integration tests
/// - Embedders that mirror the feeder without a relational backend
///
/// # Thread Safety
///
/// All tables sit behind one lock; the store can be shared across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<EntityKind, Table>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records of a kind, for assertions and debugging.
    #[must_use]
    pub fn dump(&self, kind: EntityKind) -> Vec<StoredRecord> {
        self.scan(kind).unwrap_or_default()
    }
}

impl Store for MemoryStore {
    fn get(&self, kind: EntityKind, id: LocalId) -> StoreResult<Option<StoredRecord>> {
        Ok(self.tables.read().get(&kind).and_then(|t| t.stored(id)))
    }

    fn find_by_key(&self, kind: EntityKind, key: &NaturalKey) -> StoreResult<Option<StoredRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .get(&kind)
            .and_then(|t| t.index.get(key).and_then(|id| t.stored(*id))))
    }

    fn insert(&self, kind: EntityKind, key: NaturalKey, record: Record) -> StoreResult<LocalId> {
        let mut tables = self.tables.write();
        let table = tables.entry(kind).or_default();

        if table.index.contains_key(&key) {
            return Err(StoreError::DuplicateKey { kind, key });
        }

        table.next_id += 1;
        let id = LocalId::new(table.next_id);
        table.index.insert(key.clone(), id);
        table.rows.insert(id, (key, record));
        Ok(id)
    }

    fn update(&self, kind: EntityKind, id: LocalId, patch: &Record) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let (_, record) = tables
            .get_mut(&kind)
            .and_then(|t| t.rows.get_mut(&id))
            .ok_or(StoreError::NotFound { kind, id })?;
        record.apply(patch);
        Ok(())
    }

    fn delete_where(
        &self,
        kind: EntityKind,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(&kind) else {
            return Ok(0);
        };

        let doomed: Vec<LocalId> = table
            .rows
            .iter()
            .filter(|(_, (_, record))| record.get(field).unwrap_or(&FieldValue::Null) == value)
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            if let Some((key, _)) = table.rows.remove(id) {
                table.index.remove(&key);
            }
        }

        Ok(doomed.len())
    }

    fn scan(&self, kind: EntityKind) -> StoreResult<Vec<StoredRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .get(&kind)
            .map(|t| {
                t.rows
                    .iter()
                    .map(|(id, (key, record))| StoredRecord {
                        id: *id,
                        key: key.clone(),
                        record: record.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn count(&self, kind: EntityKind) -> StoreResult<u64> {
        Ok(self
            .tables
            .read()
            .get(&kind)
            .map_or(0, |t| t.rows.len() as u64))
    }

    fn slice(&self, kind: EntityKind, offset: u64, limit: u64) -> StoreResult<Vec<StoredRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .get(&kind)
            .map(|t| {
                t.rows
                    .keys()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .filter_map(|id| t.stored(*id))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn program(store: &MemoryStore, remote: &str) -> LocalId {
        store
            .insert(
                EntityKind::Program,
                NaturalKey::remote(remote),
                Record::new().with("name", remote),
            )
            .unwrap()
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = program(&store, "a");
        let b = program(&store, "b");
        assert!(a < b);
        assert_eq!(store.count(EntityKind::Program).unwrap(), 2);
        assert_eq!(store.count(EntityKind::Course).unwrap(), 0);
    }

    #[test]
    fn duplicate_key_rejected() {
        let store = MemoryStore::new();
        program(&store, "a");
        let result = store.insert(
            EntityKind::Program,
            NaturalKey::remote("a"),
            Record::new(),
        );
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn same_key_in_different_kinds() {
        let store = MemoryStore::new();
        program(&store, "x");
        store
            .insert(EntityKind::Course, NaturalKey::remote("x"), Record::new())
            .unwrap();
        assert_eq!(store.count(EntityKind::Course).unwrap(), 1);
    }

    #[test]
    fn update_patches_fields() {
        let store = MemoryStore::new();
        let id = program(&store, "a");
        store
            .update(
                EntityKind::Program,
                id,
                &Record::new().with("name", "renamed").with("level", "S1"),
            )
            .unwrap();

        let stored = store.get(EntityKind::Program, id).unwrap().unwrap();
        assert_eq!(stored.record.text("name"), Some("renamed"));
        assert_eq!(stored.record.text("level"), Some("S1"));

        let missing = store.update(EntityKind::Program, LocalId::new(99), &Record::new());
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn delete_where_removes_key_index() {
        let store = MemoryStore::new();
        let header = FieldValue::Ref(LocalId::new(1));
        for section in ["k1", "k2"] {
            store
                .insert(
                    EntityKind::EnrollmentDetail,
                    NaturalKey::composite([section]),
                    Record::new().with("enrollment", LocalId::new(1)),
                )
                .unwrap();
        }
        store
            .insert(
                EntityKind::EnrollmentDetail,
                NaturalKey::composite(["other"]),
                Record::new().with("enrollment", LocalId::new(2)),
            )
            .unwrap();

        let removed = store
            .delete_where(EntityKind::EnrollmentDetail, "enrollment", &header)
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count(EntityKind::EnrollmentDetail).unwrap(), 1);
        assert!(store
            .find_by_key(EntityKind::EnrollmentDetail, &NaturalKey::composite(["k1"]))
            .unwrap()
            .is_none());

        // Key is free again
        store
            .insert(
                EntityKind::EnrollmentDetail,
                NaturalKey::composite(["k1"]),
                Record::new(),
            )
            .unwrap();
    }

    #[test]
    fn find_where_matches_field() {
        let store = MemoryStore::new();
        let id = program(&store, "a");
        program(&store, "b");
        let found = store
            .find_where(EntityKind::Program, "name", &FieldValue::from("a"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    proptest! {
        #[test]
        fn slices_partition_the_table(total in 0usize..60, limit in 1u64..20) {
            let store = MemoryStore::new();
            for i in 0..total {
                program(&store, &format!("p{i}"));
            }

            let mut seen = Vec::new();
            let mut offset = 0;
            while offset < total as u64 {
                let page = store.slice(EntityKind::Program, offset, limit).unwrap();
                seen.extend(page.into_iter().map(|r| r.id));
                offset += limit;
            }

            let all: Vec<_> = store.scan(EntityKind::Program).unwrap().into_iter().map(|r| r.id).collect();
            prop_assert_eq!(seen, all);
        }
    }
}
