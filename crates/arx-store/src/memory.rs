use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use arx_types::{Clock, ObjectId, SystemClock};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{Metadata, Object, ObjectKind};
use crate::traits::{IdIter, ObjectStore};

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Objects are cloned on read/write.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Object>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new empty in-memory store with an injected clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total content bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.size)
            .sum()
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn write(&self, kind: ObjectKind, content: &[u8], metadata: &Metadata) -> StoreResult<ObjectId> {
        let object = Object::new(kind, content.to_vec(), metadata.clone(), self.clock.now());
        let id = object.id;
        let mut map = self.objects.write().expect("lock poisoned");
        // Idempotent: the first writer's timestamp wins.
        map.entry(id).or_insert(object);
        debug!(%id, %kind, "object write");
        Ok(id)
    }

    fn write_object(&self, object: &Object) -> StoreResult<ObjectId> {
        object.verify()?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(object.id).or_insert_with(|| object.clone());
        Ok(object.id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Object> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn list(&self) -> StoreResult<IdIter<'_>> {
        let ids: Vec<ObjectId> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        Ok(Box::new(ids.into_iter().map(Ok)))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}
