use arx_refs::RefValue;
use arx_types::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

// ---------------------------------------------------------------------------
// Refs on the wire
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Direct,
    Symbolic,
}

/// One advertised ref: `{name, target, kind}`. `target` is a hex id for
/// direct refs and a ref path for symbolic ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub name: String,
    pub target: String,
    pub kind: RefKind,
}

impl RemoteRef {
    pub fn new(name: impl Into<String>, value: &RefValue) -> Self {
        let (target, kind) = match value {
            RefValue::Direct(id) => (id.to_hex(), RefKind::Direct),
            RefValue::Symbolic(path) => (path.clone(), RefKind::Symbolic),
        };
        Self {
            name: name.into(),
            target,
            kind,
        }
    }

    /// The object id of a direct ref.
    pub fn id(&self) -> SyncResult<Option<ObjectId>> {
        match self.kind {
            RefKind::Symbolic => Ok(None),
            RefKind::Direct => ObjectId::from_hex(&self.target)
                .map(Some)
                .map_err(|e| SyncError::Decode(format!("ref {}: {e}", self.name))),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

/// Body of `POST /objects/batch`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub ids: Vec<ObjectId>,
}

/// Body of `PUT /objects/batch`'s response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub stored: usize,
}

/// A requested ref move. `old` is what the sender believes the remote holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    pub name: String,
    pub old: Option<ObjectId>,
    pub new: ObjectId,
}

/// Per-ref outcome of `POST /refs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdateResult {
    pub name: String,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RefUpdateResult {
    pub fn accepted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// `GET /info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    pub updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What a push did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    pub objects_sent: usize,
    pub updated: Vec<String>,
    pub rejected: Vec<RefUpdateResult>,
    pub up_to_date: Vec<String>,
}

impl PushReport {
    pub fn is_success(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A local ref whose value was replaced by the remote's during pull.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overwrite {
    pub name: String,
    pub old: ObjectId,
    pub new: ObjectId,
}

/// What a pull did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullReport {
    pub objects_fetched: usize,
    /// Remote-tracking refs written (`refs/remotes/<remote>/...`).
    pub tracking: Vec<String>,
    /// Local refs created or moved to the remote's value.
    pub updated: Vec<String>,
    /// Local refs that held a different value before being overwritten.
    pub overwritten: Vec<Overwrite>,
}
