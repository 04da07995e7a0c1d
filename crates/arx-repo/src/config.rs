//! `config.json` and `repo.json`.
//!
//! Both files are plain JSON under the repository directory. Every field of
//! `config.json` has a default, so a partial or hand-edited file still loads.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use arx_refs::{validate_branch_name, MAX_SYMBOLIC_DEPTH};
use arx_store::fs::DEFAULT_COMPRESSION_LEVEL;
use arx_sync::AuthMethod;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{RepoError, RepoResult};

pub const CONFIG_FILE: &str = "config.json";
pub const REPO_FILE: &str = "repo.json";

/// Repository format written to `repo.json`.
pub const FORMAT_VERSION: &str = "1";

// ---------------------------------------------------------------------------
// config.json
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub user: UserConfig,
    pub core: CoreConfig,
    pub remotes: BTreeMap<String, RemoteConfig>,
}

/// Identity recorded on commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "arx".into(),
            email: "arx@localhost".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub default_branch: String,
    /// zstd level for new objects.
    pub compression_level: i32,
    pub symbolic_ref_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".into(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            symbolic_ref_limit: MAX_SYMBOLIC_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub auth: AuthMethod,
}

impl RepoConfig {
    pub fn load(path: &Path) -> RepoResult<Self> {
        let config: Self = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> RepoResult<()> {
        self.validate()?;
        write_json(path, self)
    }

    fn validate(&self) -> RepoResult<()> {
        validate_branch_name(&self.core.default_branch)
            .map_err(|e| RepoError::Config(format!("core.default_branch: {e}")))?;
        if !(1..=22).contains(&self.core.compression_level) {
            return Err(RepoError::Config(format!(
                "core.compression_level must be 1..=22, got {}",
                self.core.compression_level
            )));
        }
        if self.core.symbolic_ref_limit == 0 {
            return Err(RepoError::Config(
                "core.symbolic_ref_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// repo.json
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    /// Bumped by every commit and recorded rollback.
    pub updated: DateTime<Utc>,
}

impl RepoMeta {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            version: FORMAT_VERSION.into(),
            name: name.into(),
            description: String::new(),
            created: now,
            updated: now,
        }
    }

    pub fn load(path: &Path) -> RepoResult<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> RepoResult<()> {
        write_json(path, self)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> RepoResult<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))
}

/// Write through a temporary file and rename so readers never see a torn file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> RepoResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| RepoError::Config(format!("{} has no parent", path.display())))?;
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RepoError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let c = RepoConfig::default();
        assert_eq!(c.core.default_branch, "main");
        assert_eq!(c.core.compression_level, 3);
        assert_eq!(c.core.symbolic_ref_limit, 10);
        assert!(c.remotes.is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"user": {"name": "Dana"}}"#).unwrap();
        let c = RepoConfig::load(&path).unwrap();
        assert_eq!(c.user.name, "Dana");
        assert_eq!(c.user.email, "arx@localhost");
        assert_eq!(c.core, CoreConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut c = RepoConfig::default();
        c.remotes.insert(
            "origin".into(),
            RemoteConfig {
                url: "https://arx.example.com/hq".into(),
                auth: AuthMethod::bearer("t0k"),
            },
        );
        c.save(&path).unwrap();
        assert_eq!(RepoConfig::load(&path).unwrap(), c);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"type\": \"bearer\""));
    }

    #[test]
    fn bad_values_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"core": {"compression_level": 99}}"#).unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(RepoError::Config(_))));
        fs::write(&path, r#"{"core": {"default_branch": "bad..name"}}"#).unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(RepoError::Config(_))));
        fs::write(&path, "not json").unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(RepoError::Config(_))));
    }

    #[test]
    fn repo_meta_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REPO_FILE);
        let meta = RepoMeta::new("hq", DateTime::default());
        meta.save(&path).unwrap();
        let back = RepoMeta::load(&path).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.version, FORMAT_VERSION);
    }
}
