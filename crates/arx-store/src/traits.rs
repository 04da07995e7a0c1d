use arx_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Metadata, Object, ObjectKind, Tree, TreeEntry};

/// Lazy, unordered enumeration of stored ids.
pub type IdIter<'a> = Box<dyn Iterator<Item = StoreResult<ObjectId>> + 'a>;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same kind, metadata and content
///   always produce the same ID, and a second write of it is a no-op.
/// - Write-then-link: the object is durable before its ID is returned.
/// - Concurrent reads are always safe (objects are immutable).
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store content and return its content-addressed ID.
    fn write(&self, kind: ObjectKind, content: &[u8], metadata: &Metadata) -> StoreResult<ObjectId>;

    /// Store a fully formed object (e.g. received from a remote), keeping its
    /// original timestamp. The object's id is verified first.
    fn write_object(&self, object: &Object) -> StoreResult<ObjectId>;

    /// Read an object by ID. Fails with `NotFound` for unknown ids.
    fn read(&self, id: &ObjectId) -> StoreResult<Object>;

    /// Check whether an object exists without decoding it.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Enumerate every stored id. Lazy and unordered.
    fn list(&self) -> StoreResult<IdIter<'_>>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// Intended for garbage collection only. Deleting a referenced object
    /// corrupts the repository.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read an object, mapping `NotFound` to `Ok(None)`.
    fn try_read(&self, id: &ObjectId) -> StoreResult<Option<Object>> {
        match self.read(id) {
            Ok(obj) => Ok(Some(obj)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read multiple objects; missing ids yield `None` in place.
    fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<Object>>> {
        ids.iter().map(|id| self.try_read(id)).collect()
    }

    /// Store multiple received objects.
    fn write_batch(&self, objects: &[Object]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write_object(obj)).collect()
    }

    /// Store raw bytes as a blob.
    fn create_blob(&self, content: &[u8]) -> StoreResult<ObjectId> {
        self.write(ObjectKind::Blob, content, &Metadata::new())
    }

    /// Store a tree built from `entries` (sorted before hashing).
    fn create_tree(&self, entries: Vec<TreeEntry>) -> StoreResult<ObjectId> {
        let tree = Tree::new(entries);
        self.write(ObjectKind::Tree, &tree.to_content()?, &Metadata::new())
    }

    /// Read and decode a tree.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        Tree::from_object(&self.read(id)?)
    }
}
