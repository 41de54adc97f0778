//! Remote id to local id resolution.

use crate::error::{SyncError, SyncResult};
use feedsync_store::{EntityKind, LocalId, Store};
use std::collections::HashMap;

/// Remote-id to local-id map for one entity kind.
#[derive(Debug, Clone)]
pub struct ResolverMap {
    kind: EntityKind,
    ids: HashMap<String, LocalId>,
}

impl ResolverMap {
    /// Builds the map from the records currently in `store`.
    pub fn build(store: &dyn Store, kind: EntityKind) -> SyncResult<Self> {
        let ids = store
            .scan(kind)?
            .into_iter()
            .filter_map(|stored| stored.key.remote_id().map(|id| (id.to_string(), stored.id)))
            .collect();
        Ok(Self { kind, ids })
    }

    /// Returns the entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Resolves a remote id.
    pub fn get(&self, remote_id: &str) -> Option<LocalId> {
        self.ids.get(remote_id).copied()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The resolver maps used by one sync run.
#[derive(Debug, Clone, Default)]
pub struct Resolvers {
    maps: HashMap<EntityKind, ResolverMap>,
}

impl Resolvers {
    /// Builds maps for the required and optional kinds of a run.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Precondition`] if any required map is empty.
    /// This check runs before the sync issues any remote call.
    pub fn build(
        store: &dyn Store,
        required: &[EntityKind],
        optional: &[EntityKind],
    ) -> SyncResult<Self> {
        let mut maps = HashMap::new();
        for &kind in required {
            let map = ResolverMap::build(store, kind)?;
            if map.is_empty() {
                return Err(SyncError::Precondition(format!(
                    "no {kind} records; sync {kind} first"
                )));
            }
            maps.insert(kind, map);
        }
        for &kind in optional {
            if !maps.contains_key(&kind) {
                maps.insert(kind, ResolverMap::build(store, kind)?);
            }
        }
        Ok(Self { maps })
    }

    /// Resolves a remote id of `kind`. Blank ids and unknown kinds resolve to `None`.
    pub fn resolve(&self, kind: EntityKind, remote_id: Option<&str>) -> Option<LocalId> {
        self.maps.get(&kind)?.get(remote_id?)
    }

    /// Returns the map for `kind`, if it was built.
    pub fn map(&self, kind: EntityKind) -> Option<&ResolverMap> {
        self.maps.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_store::{MemoryStore, NaturalKey, Record};

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(EntityKind::Program, NaturalKey::remote("P1"), Record::new())
            .unwrap();
        store
            .insert(EntityKind::Program, NaturalKey::remote("P2"), Record::new())
            .unwrap();
        store
    }

    #[test]
    fn resolves_remote_ids() {
        let store = store();
        let resolvers = Resolvers::build(&store, &[EntityKind::Program], &[]).unwrap();
        assert_eq!(
            resolvers.resolve(EntityKind::Program, Some("P2")),
            Some(LocalId::new(2))
        );
        assert_eq!(resolvers.resolve(EntityKind::Program, Some("P9")), None);
        assert_eq!(resolvers.resolve(EntityKind::Program, None), None);
        assert_eq!(resolvers.resolve(EntityKind::Term, Some("20241")), None);
    }

    #[test]
    fn empty_required_map_is_precondition_failure() {
        let store = store();
        let err = Resolvers::build(&store, &[EntityKind::Program, EntityKind::Course], &[])
            .unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));
    }

    #[test]
    fn empty_optional_map_is_fine() {
        let store = store();
        let resolvers =
            Resolvers::build(&store, &[EntityKind::Program], &[EntityKind::Term]).unwrap();
        assert!(resolvers.map(EntityKind::Term).unwrap().is_empty());
    }
}
