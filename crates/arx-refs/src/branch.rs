//! Branch policy records.
//!
//! A branch ref only names a commit. The policy record stored next to it
//! carries what kind of branch it is and how it may be treated: whether it is
//! protected from deletion, whether changes need review, and whether it goes
//! away once merged.

use arx_types::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow role of a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    Main,
    Feature,
    Bugfix,
    Release,
    Hotfix,
    Contractor,
    Vendor,
    Issue,
    Scan,
    Development,
}

impl BranchType {
    /// Infer the type from a branch name: `main`/`master`, `develop`, or the
    /// first path component (`feature/...`, `contractor/...`). Unknown
    /// prefixes are feature branches.
    pub fn from_name(name: &str) -> Self {
        match name {
            "main" | "master" => return BranchType::Main,
            "develop" | "development" | "dev" => return BranchType::Development,
            _ => {}
        }
        match name.split('/').next().unwrap_or(name) {
            "bugfix" | "fix" => BranchType::Bugfix,
            "release" => BranchType::Release,
            "hotfix" => BranchType::Hotfix,
            "contractor" => BranchType::Contractor,
            "vendor" => BranchType::Vendor,
            "issue" => BranchType::Issue,
            "scan" => BranchType::Scan,
            "develop" | "dev" => BranchType::Development,
            _ => BranchType::Feature,
        }
    }

    /// Default policy for branches of this type.
    pub fn default_policy(self) -> BranchPolicy {
        match self {
            BranchType::Main => BranchPolicy {
                protected: true,
                requires_review: true,
                auto_delete_on_merge: false,
            },
            BranchType::Release => BranchPolicy {
                protected: true,
                requires_review: true,
                auto_delete_on_merge: false,
            },
            BranchType::Hotfix => BranchPolicy {
                protected: true,
                requires_review: false,
                auto_delete_on_merge: true,
            },
            BranchType::Development => BranchPolicy {
                protected: false,
                requires_review: false,
                auto_delete_on_merge: false,
            },
            _ => BranchPolicy {
                protected: false,
                requires_review: false,
                auto_delete_on_merge: true,
            },
        }
    }
}

impl std::fmt::Display for BranchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BranchType::Main => "main",
            BranchType::Feature => "feature",
            BranchType::Bugfix => "bugfix",
            BranchType::Release => "release",
            BranchType::Hotfix => "hotfix",
            BranchType::Contractor => "contractor",
            BranchType::Vendor => "vendor",
            BranchType::Issue => "issue",
            BranchType::Scan => "scan",
            BranchType::Development => "development",
        };
        write!(f, "{s}")
    }
}

/// Protection flags applied to a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPolicy {
    pub protected: bool,
    pub requires_review: bool,
    pub auto_delete_on_merge: bool,
}

/// Lifecycle state of a branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchStatus {
    #[default]
    Active,
    Merged,
    Archived,
}

/// A branch with its policy metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub repository: String,
    pub name: String,
    /// Commit the branch was created from.
    pub base_commit: ObjectId,
    /// Tip at the time the record was last read; the ref is authoritative.
    pub head_commit: ObjectId,
    pub branch_type: BranchType,
    pub protected: bool,
    pub requires_review: bool,
    pub auto_delete_on_merge: bool,
    #[serde(default)]
    pub status: BranchStatus,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// A new active branch with the default policy for its inferred type.
    pub fn new(
        repository: impl Into<String>,
        name: impl Into<String>,
        base_commit: ObjectId,
        created_at: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let branch_type = BranchType::from_name(&name);
        let policy = branch_type.default_policy();
        Self {
            id: Uuid::now_v7(),
            repository: repository.into(),
            name,
            base_commit,
            head_commit: base_commit,
            branch_type,
            protected: policy.protected,
            requires_review: policy.requires_review,
            auto_delete_on_merge: policy.auto_delete_on_merge,
            status: BranchStatus::Active,
            is_default: false,
            created_at,
        }
    }

    /// Mark as the repository's default branch.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn policy(&self) -> BranchPolicy {
        BranchPolicy {
            protected: self.protected,
            requires_review: self.requires_review,
            auto_delete_on_merge: self.auto_delete_on_merge,
        }
    }
}
