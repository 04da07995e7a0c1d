use std::collections::BTreeMap;

use arx_types::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::hasher::{ContentHasher, SEPARATOR};

/// Free-form key/value metadata attached to an object. Part of its identity.
pub type Metadata = BTreeMap<String, String>;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// History node: parents, author, message, snapshot pointer.
    Commit,
    /// Ordered listing of named child objects.
    Tree,
    /// One serialized entity (or any opaque bytes).
    Blob,
    /// Named, annotated pointer to another object.
    Tag,
    /// Root of one building state: the four category subtrees.
    Snapshot,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Tree => write!(f, "tree"),
            Self::Blob => write!(f, "blob"),
            Self::Tag => write!(f, "tag"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Stored header: everything about an object except its content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct WireHeader {
    kind: ObjectKind,
    size: u64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: Metadata,
}

/// An immutable, content-addressed unit of storage.
///
/// `id` is always `ContentHasher::OBJECT.object_id(kind, metadata, content)`;
/// [`Object::verify`] re-checks that after a read or a network transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "hex_bytes")]
    pub content: Vec<u8>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Object {
    /// Build an object and compute its id.
    pub fn new(
        kind: ObjectKind,
        content: Vec<u8>,
        metadata: Metadata,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let id = ContentHasher::OBJECT.object_id(kind, &metadata, &content);
        Self {
            id,
            kind,
            size: content.len() as u64,
            timestamp,
            content,
            metadata,
        }
    }

    /// Recompute the id from kind, metadata and content.
    pub fn compute_id(&self) -> ObjectId {
        ContentHasher::OBJECT.object_id(self.kind, &self.metadata, &self.content)
    }

    /// Fail with `HashMismatch` if the recorded id does not match the content.
    pub fn verify(&self) -> StoreResult<()> {
        let computed = self.compute_id();
        if computed != self.id {
            return Err(StoreError::HashMismatch {
                id: self.id,
                computed,
            });
        }
        Ok(())
    }

    /// Encode as `<json header>\n---\n<content>` (uncompressed).
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let header = WireHeader {
            kind: self.kind,
            size: self.size,
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        };
        let mut out =
            serde_json::to_vec(&header).map_err(|e| StoreError::Serialization(e.to_string()))?;
        out.extend_from_slice(SEPARATOR);
        out.extend_from_slice(&self.content);
        Ok(out)
    }

    /// Decode the wire format for the object expected at `id`.
    ///
    /// Fails with `CorruptObject` if the separator is absent or the header
    /// cannot be decoded, and with `HashMismatch` if the bytes do not hash
    /// back to `id`.
    pub fn decode(id: ObjectId, bytes: &[u8]) -> StoreResult<Self> {
        let split = find_separator(bytes).ok_or_else(|| StoreError::CorruptObject {
            id,
            reason: "missing header separator".into(),
        })?;
        let header: WireHeader =
            serde_json::from_slice(&bytes[..split]).map_err(|e| StoreError::CorruptObject {
                id,
                reason: format!("bad header: {e}"),
            })?;
        let content = bytes[split + SEPARATOR.len()..].to_vec();
        if header.size != content.len() as u64 {
            return Err(StoreError::CorruptObject {
                id,
                reason: format!(
                    "size mismatch: header says {}, content is {}",
                    header.size,
                    content.len()
                ),
            });
        }
        let object = Self {
            id,
            kind: header.kind,
            size: header.size,
            timestamp: header.timestamp,
            content,
            metadata: header.metadata,
        };
        object.verify()?;
        Ok(object)
    }

    /// Deserialize the JSON content of an object of the expected kind.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self, expected: ObjectKind) -> StoreResult<T> {
        if self.kind != expected {
            return Err(StoreError::CorruptObject {
                id: self.id,
                reason: format!("expected {expected}, got {}", self.kind),
            });
        }
        serde_json::from_slice(&self.content).map_err(|e| StoreError::CorruptObject {
            id: self.id,
            reason: format!("bad {expected} content: {e}"),
        })
    }
}

fn find_separator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(SEPARATOR.len())
        .position(|window| window == SEPARATOR)
}

/// Serde helper: byte content as a hex string in JSON.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Leaf object (0o100644).
    Regular,
    /// Subtree (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value (for display/serialization).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Directory => 0o040000,
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name (entity id, equipment type, category name).
    pub name: String,
    /// Kind of the referenced object (usually `tree` or `blob`).
    pub kind: ObjectKind,
    /// Content-addressed ID of the referenced object.
    pub id: ObjectId,
    pub mode: EntryMode,
}

impl TreeEntry {
    /// Entry pointing at a blob.
    pub fn blob(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Blob,
            id,
            mode: EntryMode::Regular,
        }
    }

    /// Entry pointing at a subtree.
    pub fn tree(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Tree,
            id,
            mode: EntryMode::Directory,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.kind == ObjectKind::Tree
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Directory listing object (analogous to git tree).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by name.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted by name for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialized tree content.
    pub fn to_content(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode from a stored object.
    pub fn from_object(obj: &Object) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Tree)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Build a `name -> entry` index over this tree.
    pub fn index(&self) -> BTreeMap<&str, &TreeEntry> {
        self.entries.iter().map(|e| (e.name.as_str(), e)).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SnapshotObject
// ---------------------------------------------------------------------------

/// Denormalized counts carried by a snapshot for cheap validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub floor_count: u64,
    pub room_count: u64,
    pub equipment_count: u64,
    pub file_count: u64,
    pub point_count: u64,
}

/// One versioned building state split into independent category subtrees.
///
/// An unchanged category keeps the same subtree id across snapshots, which
/// makes "did this area change" a single id comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotObject {
    #[serde(default)]
    pub building_id: String,
    /// Building record, floors and rooms.
    pub space: ObjectId,
    /// Equipment, one subtree per equipment type.
    pub items: ObjectId,
    /// Attachments.
    pub files: ObjectId,
    /// BAS / operational points.
    pub operations: ObjectId,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

impl SnapshotObject {
    /// Serialized snapshot content.
    pub fn to_content(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode from a stored object.
    pub fn from_object(obj: &Object) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Snapshot)
    }

    /// The four category subtrees, in a fixed order.
    pub fn subtrees(&self) -> [(&'static str, ObjectId); 4] {
        [
            ("space", self.space),
            ("items", self.items),
            ("files", self.files),
            ("operations", self.operations),
        ]
    }
}

// ---------------------------------------------------------------------------
// CommitObject
// ---------------------------------------------------------------------------

/// History node.
///
/// Wire content: JSON `{parent, author, email, message, timestamp, tree, changes}`
/// where `parent` is empty for the root commit and has two or more entries
/// for merges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitObject {
    #[serde(rename = "parent", default)]
    pub parents: Vec<ObjectId>,
    pub author: String,
    pub email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Snapshot (or plain tree) this commit records.
    pub tree: ObjectId,
    /// Change counts against the first parent, keyed by counter name.
    #[serde(default)]
    pub changes: BTreeMap<String, u64>,
}

impl CommitObject {
    /// Serialized commit content.
    pub fn to_content(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode from a stored object.
    pub fn from_object(obj: &Object) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Commit)
    }

    /// First parent, if any.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}
