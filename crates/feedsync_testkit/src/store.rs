//! Store wrappers for failure injection.

use feedsync_store::{
    EntityKind, FieldValue, LocalId, NaturalKey, Record, Store, StoreError, StoreResult,
    StoredRecord,
};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Wraps a store and fails writes for chosen natural keys.
#[derive(Debug)]
pub struct FlakyStore<S: Store> {
    inner: S,
    poisoned: Mutex<HashSet<(EntityKind, String)>>,
}

impl<S: Store> FlakyStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            poisoned: Mutex::new(HashSet::new()),
        }
    }

    /// Makes inserts and updates of the record keyed `key` fail.
    ///
    /// `key` is compared against the natural key's display form.
    pub fn fail_writes(&self, kind: EntityKind, key: impl Into<String>) {
        self.poisoned.lock().insert((kind, key.into()));
    }

    /// Lets every write through again.
    pub fn heal(&self) {
        self.poisoned.lock().clear();
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, kind: EntityKind, key: &NaturalKey) -> StoreResult<()> {
        if self.poisoned.lock().contains(&(kind, key.to_string())) {
            return Err(StoreError::backend(format!("injected write failure for {kind} {key}")));
        }
        Ok(())
    }
}

impl<S: Store> Store for FlakyStore<S> {
    fn get(&self, kind: EntityKind, id: LocalId) -> StoreResult<Option<StoredRecord>> {
        self.inner.get(kind, id)
    }

    fn find_by_key(&self, kind: EntityKind, key: &NaturalKey) -> StoreResult<Option<StoredRecord>> {
        self.inner.find_by_key(kind, key)
    }

    fn insert(&self, kind: EntityKind, key: NaturalKey, record: Record) -> StoreResult<LocalId> {
        self.check(kind, &key)?;
        self.inner.insert(kind, key, record)
    }

    fn update(&self, kind: EntityKind, id: LocalId, patch: &Record) -> StoreResult<()> {
        if let Some(stored) = self.inner.get(kind, id)? {
            self.check(kind, &stored.key)?;
        }
        self.inner.update(kind, id, patch)
    }

    fn delete_where(
        &self,
        kind: EntityKind,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<usize> {
        self.inner.delete_where(kind, field, value)
    }

    fn scan(&self, kind: EntityKind) -> StoreResult<Vec<StoredRecord>> {
        self.inner.scan(kind)
    }

    fn count(&self, kind: EntityKind) -> StoreResult<u64> {
        self.inner.count(kind)
    }

    fn slice(&self, kind: EntityKind, offset: u64, limit: u64) -> StoreResult<Vec<StoredRecord>> {
        self.inner.slice(kind, offset, limit)
    }
}
