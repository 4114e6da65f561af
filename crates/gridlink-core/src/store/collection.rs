// ── Generic reactive registry collection ──
//
// Lock-free concurrent storage with O(1) lookups and push-based change
// notification via `watch` channels. Keys are net-location strings
// (`adapter/address[/aux]`); the secondary index maps registry ids back
// to keys.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::EntityId;

/// A reactive collection for a single entity type.
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive.
pub(crate) struct RegistryCollection<T: Clone + Send + Sync + 'static> {
    /// Primary storage: net key -> entity.
    by_key: DashMap<String, Arc<T>>,

    /// Secondary index: registry id -> net key.
    id_to_key: DashMap<EntityId, String>,

    /// Reverse of `id_to_key` for efficient removal.
    key_to_id: DashMap<String, EntityId>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> RegistryCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert a newly registered entity. Returns `false` (and leaves the
    /// collection untouched) if the key is already present.
    pub(crate) fn insert(&self, key: String, id: EntityId, entity: T) -> bool {
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key.clone(), Arc::new(entity));
        self.id_to_key.insert(id, key.clone());
        self.key_to_id.insert(key, id);

        self.rebuild_snapshot();
        self.bump_version();
        true
    }

    /// Mutate an entity in place. Returns `None` if the key is unknown,
    /// otherwise the closure's result. Subscribers see the new state.
    pub(crate) fn update<R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            let mut entry = self.by_key.get_mut(key)?;
            let entity = Arc::make_mut(entry.value_mut());
            f(entity)
        };
        self.rebuild_snapshot();
        self.bump_version();
        Some(result)
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            if let Some((_, id)) = self.key_to_id.remove(key) {
                self.id_to_key.remove(&id);
            }
            self.rebuild_snapshot();
            self.bump_version();
        }
        removed
    }

    /// Look up an entity by its net key.
    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Look up an entity by its registry id (secondary index).
    pub(crate) fn get_by_id(&self, id: EntityId) -> Option<Arc<T>> {
        let key = self.id_to_key.get(&id)?;
        self.by_key
            .get(key.value().as_str())
            .map(|r| Arc::clone(r.value()))
    }

    /// Resolve a registry id back to its net key.
    pub(crate) fn key_of(&self, id: EntityId) -> Option<String> {
        self.id_to_key.get(&id).map(|r| r.value().clone())
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values into a snapshot vec and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<T>> = self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    /// Increment the version counter.
    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
