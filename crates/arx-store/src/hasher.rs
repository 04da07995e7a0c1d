use arx_types::ObjectId;
use serde::Serialize;

use crate::object::{Metadata, ObjectKind};

/// Separator between the JSON header and the raw content, both in the
/// hashed preimage and in the stored wire format.
pub const SEPARATOR: &[u8] = b"\n---\n";

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag (`"arx-object-v1"`) is prepended to every preimage so
/// that object ids never collide with digests computed elsewhere (for
/// example attachment body digests).
pub struct ContentHasher {
    domain: &'static str,
}

/// The header fields that participate in an object's identity.
///
/// `timestamp` is deliberately absent: two writes of the same content at
/// different times must produce the same id.
#[derive(Serialize)]
struct IdentityHeader<'a> {
    kind: ObjectKind,
    size: u64,
    metadata: &'a Metadata,
}

impl ContentHasher {
    /// Hasher for stored objects.
    pub const OBJECT: Self = Self {
        domain: "arx-object-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Compute the id of an object: `hash(header || SEPARATOR || content)`.
    pub fn object_id(&self, kind: ObjectKind, metadata: &Metadata, content: &[u8]) -> ObjectId {
        let header = IdentityHeader {
            kind,
            size: content.len() as u64,
            metadata,
        };
        // BTreeMap keys serialize in order, so the header encoding is canonical.
        let header = serde_json::to_vec(&header).unwrap_or_default();

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&header);
        hasher.update(SEPARATOR);
        hasher.update(content);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
