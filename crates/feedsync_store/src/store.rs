//! Store trait definition.

use crate::error::StoreResult;
use crate::kind::EntityKind;
use crate::record::{FieldValue, Record, StoredRecord};
use crate::types::{LocalId, NaturalKey};

/// The host's storage-access interface.
///
/// The sync engine only creates, reads and updates records through this
/// trait; the single deletion path ([`Store::delete_where`]) is used to
/// replace enrollment details.
///
/// # Invariants
///
/// - `insert` assigns a fresh [`LocalId`] greater than every id it
///   assigned before for the same kind
/// - a natural key maps to at most one record per kind
/// - `slice` and `scan` return records in ascending id order
/// - implementations must be `Send + Sync`; callers serialize writes to
///   the same kind
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing and embedding
pub trait Store: Send + Sync {
    /// Reads a record by local id.
    fn get(&self, kind: EntityKind, id: LocalId) -> StoreResult<Option<StoredRecord>>;

    /// Reads a record by natural key.
    fn find_by_key(&self, kind: EntityKind, key: &NaturalKey) -> StoreResult<Option<StoredRecord>>;

    /// Inserts a new record and returns its local id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::DuplicateKey`] if the natural key is taken.
    fn insert(&self, kind: EntityKind, key: NaturalKey, record: Record) -> StoreResult<LocalId>;

    /// Overwrites the fields present in `patch`, leaving others intact.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if no record has `id`.
    fn update(&self, kind: EntityKind, id: LocalId, patch: &Record) -> StoreResult<()>;

    /// Deletes every record whose `field` equals `value`, returning the count.
    fn delete_where(&self, kind: EntityKind, field: &str, value: &FieldValue)
        -> StoreResult<usize>;

    /// Returns every record of a kind.
    fn scan(&self, kind: EntityKind) -> StoreResult<Vec<StoredRecord>>;

    /// Returns every record whose `field` equals `value`.
    fn find_where(
        &self,
        kind: EntityKind,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Vec<StoredRecord>> {
        Ok(self
            .scan(kind)?
            .into_iter()
            .filter(|r| r.record.get(field).unwrap_or(&FieldValue::Null) == value)
            .collect())
    }

    /// Returns the number of records of a kind.
    fn count(&self, kind: EntityKind) -> StoreResult<u64> {
        Ok(self.scan(kind)?.len() as u64)
    }

    /// Returns up to `limit` records starting at position `offset` in id order.
    fn slice(&self, kind: EntityKind, offset: u64, limit: u64) -> StoreResult<Vec<StoredRecord>> {
        Ok(self
            .scan(kind)?
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
