//! Filesystem object store.
//!
//! On-disk layout, rooted at the repository's `objects/` directory:
//!
//! ```text
//! objects/
//!   3f/
//!     a9c0...   (62 hex chars) zstd( <json header>\n---\n<content> )
//! ```
//!
//! The first byte of the id selects one of 256 shard directories so no
//! single directory grows without bound. Files are written to a temporary
//! name inside the shard and renamed into place, so a crashed write never
//! leaves a truncated object under a valid id.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arx_types::{Clock, ObjectId, SystemClock};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::object::{Metadata, Object, ObjectKind};
use crate::traits::{IdIter, ObjectStore};

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Sharded, compressed object store on a local filesystem.
pub struct FsObjectStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    compression_level: i32,
}

impl FsObjectStore {
    /// Open (creating if needed) an object store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_with(root, Arc::new(SystemClock), DEFAULT_COMPRESSION_LEVEL)
    }

    /// Open with an injected clock and compression level.
    pub fn open_with(
        root: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        compression_level: i32,
    ) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            clock,
            compression_level,
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.shard();
        self.root.join(dir).join(file)
    }

    fn persist(&self, object: &Object) -> StoreResult<()> {
        let path = self.object_path(&object.id);
        if path.exists() {
            debug!(id = %object.id, "object already present; skipping write");
            return Ok(());
        }
        let shard = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&shard)?;

        let encoded = object.encode()?;
        let compressed = zstd::encode_all(&encoded[..], self.compression_level)?;

        let mut tmp = NamedTempFile::new_in(&shard)?;
        tmp.write_all(&compressed)?;
        tmp.as_file().sync_all()?;
        // A concurrent writer may have won the race; its bytes are identical.
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            id = %object.id,
            kind = %object.kind,
            size = object.size,
            stored = compressed.len(),
            "object write"
        );
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn write(&self, kind: ObjectKind, content: &[u8], metadata: &Metadata) -> StoreResult<ObjectId> {
        let object = Object::new(kind, content.to_vec(), metadata.clone(), self.clock.now());
        self.persist(&object)?;
        Ok(object.id)
    }

    fn write_object(&self, object: &Object) -> StoreResult<ObjectId> {
        object.verify()?;
        self.persist(object)?;
        Ok(object.id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Object> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*id))
            }
            Err(e) => return Err(e.into()),
        };
        let bytes = zstd::decode_all(&compressed[..]).map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: format!("decompression failed: {e}"),
        })?;
        Object::decode(*id, &bytes)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn list(&self) -> StoreResult<IdIter<'_>> {
        let iter = WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(StoreError::Io(e.into()))),
                };
                if !entry.file_type().is_file() {
                    return None;
                }
                let shard = entry.path().parent()?.file_name()?.to_str()?;
                let rest = entry.file_name().to_str()?;
                let hex = format!("{shard}{rest}");
                if !ObjectId::is_hex_id(&hex) {
                    // Temporary files from in-flight writes land here too.
                    return None;
                }
                match ObjectId::from_hex(&hex) {
                    Ok(id) => Some(Ok(id)),
                    Err(e) => {
                        warn!(path = %entry.path().display(), "unparseable object file name");
                        Some(Err(StoreError::InvalidId(e)))
                    }
                }
            });
        Ok(Box::new(iter))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsObjectStore")
            .field("root", &self.root)
            .field("compression_level", &self.compression_level)
            .finish()
    }
}
