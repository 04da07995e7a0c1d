use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use arx_diff::{DiffResult, DiffService};
use arx_refs::{
    validate_remote_name, FsRefStore, InMemoryRefStore, RefStore, RefValue, HEAD, HEADS,
};
use arx_rollback::{RollbackOptions, RollbackResult, RollbackService};
use arx_snapshot::{LiveRepositories, SnapshotBuilder};
use arx_store::{
    collect_garbage, CommitObject, FsObjectStore, GcReport, InMemoryObjectStore, Metadata,
    ObjectKind, ObjectStore,
};
use arx_sync::{
    HttpRemote, PullOptions, PullReport, PushReport, RemoteTransport, RepoInfo, RepositoryHost,
    SyncEngine,
};
use arx_types::{Clock, ObjectId, SystemClock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{RemoteConfig, RepoConfig, RepoMeta, CONFIG_FILE, REPO_FILE};
use crate::error::{RepoError, RepoResult};

/// Name of the repository directory inside a working directory.
pub const ARX_DIR: &str = ".arx";

/// What a commit produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: ObjectId,
    pub tree: ObjectId,
    pub parent: Option<ObjectId>,
    /// Branch advanced by the commit; `None` when HEAD is detached.
    pub branch: Option<String>,
    pub changes: BTreeMap<String, u64>,
}

/// One commit in a log walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: ObjectId,
    pub commit: CommitObject,
}

/// A building version-control repository: object store, refs, config.
pub struct Repository {
    /// The `.arx` directory; `None` for in-memory repositories.
    dir: Option<PathBuf>,
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    clock: Arc<dyn Clock>,
    config: RwLock<RepoConfig>,
    meta: RwLock<RepoMeta>,
}

impl Repository {
    // ---- Lifecycle ----

    /// Create `<workdir>/.arx` with default configuration.
    pub fn init(workdir: &Path, name: &str) -> RepoResult<Self> {
        Self::init_with(workdir, name, RepoConfig::default(), Arc::new(SystemClock))
    }

    /// Create `<workdir>/.arx` with `config` and an injected clock.
    pub fn init_with(
        workdir: &Path,
        name: &str,
        config: RepoConfig,
        clock: Arc<dyn Clock>,
    ) -> RepoResult<Self> {
        let dir = workdir.join(ARX_DIR);
        if dir.join(REPO_FILE).exists() {
            return Err(RepoError::AlreadyInitialized(dir));
        }
        fs::create_dir_all(&dir)?;
        config.save(&dir.join(CONFIG_FILE))?;
        let meta = RepoMeta::new(name, clock.now());
        meta.save(&dir.join(REPO_FILE))?;

        let repo = Self::assemble(dir, config, meta, clock)?;
        let default_branch = repo.config().core.default_branch;
        repo.refs.init(&default_branch)?;
        info!(path = %workdir.display(), name, "initialized repository");
        Ok(repo)
    }

    /// Open the repository in `<workdir>/.arx`.
    pub fn open(workdir: &Path) -> RepoResult<Self> {
        Self::open_with_clock(workdir, Arc::new(SystemClock))
    }

    pub fn open_with_clock(workdir: &Path, clock: Arc<dyn Clock>) -> RepoResult<Self> {
        let dir = workdir.join(ARX_DIR);
        let repo_file = dir.join(REPO_FILE);
        if !repo_file.is_file() {
            return Err(RepoError::NotInitialized(repo_file));
        }
        let meta = RepoMeta::load(&repo_file)?;
        let config = RepoConfig::load(&dir.join(CONFIG_FILE))?;
        Self::assemble(dir, config, meta, clock)
    }

    fn assemble(
        dir: PathBuf,
        config: RepoConfig,
        meta: RepoMeta,
        clock: Arc<dyn Clock>,
    ) -> RepoResult<Self> {
        let objects = FsObjectStore::open_with(
            dir.join("objects"),
            clock.clone(),
            config.core.compression_level,
        )?;
        let refs = FsRefStore::with_clock(&dir, clock.clone())
            .with_repository(meta.name.clone())
            .with_symbolic_limit(config.core.symbolic_ref_limit);
        Ok(Self {
            dir: Some(dir),
            objects: Arc::new(objects),
            refs: Arc::new(refs),
            clock,
            config: RwLock::new(config),
            meta: RwLock::new(meta),
        })
    }

    /// A repository held entirely in memory, for tests and embedding.
    pub fn in_memory(name: &str, clock: Arc<dyn Clock>) -> RepoResult<Self> {
        let config = RepoConfig::default();
        let refs = InMemoryRefStore::with_clock(clock.clone());
        refs.init(&config.core.default_branch)?;
        Ok(Self {
            dir: None,
            objects: Arc::new(InMemoryObjectStore::with_clock(clock.clone())),
            refs: Arc::new(refs),
            meta: RwLock::new(RepoMeta::new(name, clock.now())),
            clock,
            config: RwLock::new(config),
        })
    }

    // ---- Accessors ----

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    pub fn config(&self) -> RepoConfig {
        self.config.read().expect("lock poisoned").clone()
    }

    pub fn meta(&self) -> RepoMeta {
        self.meta.read().expect("lock poisoned").clone()
    }

    /// Set the description recorded in `repo.json`.
    pub fn set_description(&self, description: &str) -> RepoResult<()> {
        let mut meta = self.meta.write().expect("lock poisoned");
        meta.description = description.to_string();
        self.save_meta(&meta)
    }

    fn touch(&self) -> RepoResult<()> {
        let mut meta = self.meta.write().expect("lock poisoned");
        meta.updated = self.clock.now();
        self.save_meta(&meta)
    }

    fn save_meta(&self, meta: &RepoMeta) -> RepoResult<()> {
        match &self.dir {
            Some(dir) => meta.save(&dir.join(REPO_FILE)),
            None => Ok(()),
        }
    }

    fn save_config(&self, config: &RepoConfig) -> RepoResult<()> {
        match &self.dir {
            Some(dir) => config.save(&dir.join(CONFIG_FILE)),
            None => Ok(()),
        }
    }

    // ---- Commits ----

    /// Snapshot the live state of `building_id` and commit it.
    pub fn commit(
        &self,
        live: &LiveRepositories,
        building_id: &str,
        message: &str,
    ) -> RepoResult<CommitInfo> {
        let (snapshot, _) =
            SnapshotBuilder::new(self.objects.as_ref()).capture(live, building_id)?;
        self.commit_tree(snapshot, message)
    }

    /// Commit an existing snapshot or tree on top of HEAD.
    ///
    /// On a branch the ref is moved with compare-and-swap, so a concurrent
    /// commit to the same branch makes this one fail instead of being lost.
    pub fn commit_tree(&self, tree: ObjectId, message: &str) -> RepoResult<CommitInfo> {
        let (branch, parent) = match self.refs.head()? {
            RefValue::Symbolic(path) => {
                let parent = self.refs.read(&path)?.and_then(|v| v.as_direct());
                (Some(path), parent)
            }
            RefValue::Direct(id) => (None, Some(id)),
        };
        let changes = self.change_counters(parent, tree)?;

        let user = self.config().user;
        let commit = CommitObject {
            parents: parent.into_iter().collect(),
            author: user.name,
            email: user.email,
            message: message.to_string(),
            timestamp: self.clock.now(),
            tree,
            changes: changes.clone(),
        };
        let id = self
            .objects
            .write(ObjectKind::Commit, &commit.to_content()?, &Metadata::new())?;

        let summary = message.lines().next().unwrap_or_default();
        let reflog = match parent {
            Some(_) => format!("commit: {summary}"),
            None => format!("commit (initial): {summary}"),
        };
        match &branch {
            Some(path) => {
                let expected = parent.map(RefValue::Direct);
                self.refs
                    .compare_and_swap(path, expected.as_ref(), &RefValue::Direct(id), &reflog)?;
            }
            None => self.refs.detach_head(id, &reflog)?,
        }
        // The commit has landed; repo.json is bookkeeping.
        if let Err(e) = self.touch() {
            warn!(commit = %id, error = %e, "could not update repo.json after commit");
        }

        let branch = branch.map(|p| p.trim_start_matches(HEADS).to_string());
        info!(
            commit = %id,
            branch = ?branch,
            total = changes.get("total_changes").copied().unwrap_or(0),
            "committed"
        );
        Ok(CommitInfo {
            id,
            tree,
            parent,
            branch,
            changes,
        })
    }

    /// Diff counters against the parent (or an empty tree for a root
    /// commit). Trees that are not building snapshots get no counters.
    fn change_counters(
        &self,
        parent: Option<ObjectId>,
        tree: ObjectId,
    ) -> RepoResult<BTreeMap<String, u64>> {
        let base = match parent {
            Some(parent) => parent,
            None => self.objects.create_tree(Vec::new())?,
        };
        match DiffService::new(self.objects.as_ref()).diff(&base, &tree) {
            Ok(diff) => Ok(diff.summary.counters()),
            Err(e) => {
                warn!(tree = %tree, error = %e, "could not summarize changes");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Read the commit `target` names.
    pub fn show(&self, target: &str) -> RepoResult<CommitObject> {
        let id = self.refs.resolve_target(target)?;
        self.read_commit(&id)
    }

    fn read_commit(&self, id: &ObjectId) -> RepoResult<CommitObject> {
        let object = self.objects.read(id)?;
        if object.kind != ObjectKind::Commit {
            return Err(RepoError::NotACommit(id.to_hex()));
        }
        Ok(CommitObject::from_object(&object)?)
    }

    /// Up to `limit` commits starting at `target`, newest first, following
    /// first parents.
    pub fn log(&self, target: &str, limit: usize) -> RepoResult<Vec<LogEntry>> {
        let mut out = Vec::new();
        let mut next = Some(self.refs.resolve_target(target)?);
        while let Some(id) = next {
            if out.len() >= limit {
                break;
            }
            let commit = self.read_commit(&id)?;
            next = commit.parent();
            out.push(LogEntry { id, commit });
        }
        Ok(out)
    }

    // ---- Branches and tags ----

    /// Create a branch at `from` (default: HEAD).
    pub fn create_branch(&self, name: &str, from: Option<&str>) -> RepoResult<ObjectId> {
        Ok(self.refs.create_branch(name, from.unwrap_or(HEAD))?)
    }

    pub fn delete_branch(&self, name: &str) -> RepoResult<()> {
        Ok(self.refs.delete_branch(name)?)
    }

    pub fn branches(&self) -> RepoResult<Vec<String>> {
        Ok(self.refs.branches()?)
    }

    pub fn current_branch(&self) -> RepoResult<String> {
        Ok(self.refs.current_branch()?)
    }

    pub fn checkout(&self, branch: &str) -> RepoResult<()> {
        Ok(self.refs.checkout(branch)?)
    }

    pub fn create_tag(&self, name: &str, target: &str, message: &str) -> RepoResult<ObjectId> {
        Ok(self.refs.create_tag(name, target, message)?)
    }

    pub fn delete_tag(&self, name: &str) -> RepoResult<()> {
        Ok(self.refs.delete_tag(name)?)
    }

    pub fn tags(&self) -> RepoResult<Vec<String>> {
        Ok(self.refs.tags()?)
    }

    // ---- Diff and rollback ----

    /// Diff two versions named by ref or id.
    pub fn diff(&self, from: &str, to: &str) -> RepoResult<DiffResult> {
        let from_id = self.refs.resolve_target(from)?;
        let to_id = self.refs.resolve_target(to)?;
        let diff = DiffService::new(self.objects.as_ref()).diff(&from_id, &to_id)?;
        Ok(diff.with_labels(from, to))
    }

    /// Restore the live state of `building_id` to `target`.
    pub fn rollback(
        &self,
        live: &LiveRepositories,
        building_id: &str,
        target: &str,
        options: &RollbackOptions,
    ) -> RollbackResult {
        let user = self.config().user;
        let result = RollbackService::new(self.objects.clone(), self.refs.clone(), live.clone())
            .with_clock(self.clock.clone())
            .with_author(user.name, user.email)
            .rollback(building_id, target, options);
        if result.new_version.is_some() {
            if let Err(e) = self.touch() {
                warn!(error = %e, "could not update repo.json after rollback");
            }
        }
        result
    }

    // ---- Maintenance ----

    /// Delete objects unreachable from every ref and reflog entry.
    pub fn gc(&self, dry_run: bool) -> RepoResult<GcReport> {
        let roots = self.refs.gc_roots()?;
        Ok(collect_garbage(self.objects.as_ref(), roots, dry_run)?)
    }

    // ---- Remotes ----

    pub fn add_remote(&self, name: &str, remote: RemoteConfig) -> RepoResult<()> {
        validate_remote_name(name)?;
        HttpRemote::new(&remote.url, remote.auth.clone())?;
        let mut config = self.config.write().expect("lock poisoned");
        config.remotes.insert(name.to_string(), remote);
        self.save_config(&config)
    }

    pub fn remove_remote(&self, name: &str) -> RepoResult<()> {
        let mut config = self.config.write().expect("lock poisoned");
        if config.remotes.remove(name).is_none() {
            return Err(RepoError::UnknownRemote(name.to_string()));
        }
        self.save_config(&config)
    }

    /// HTTP client for a configured remote.
    pub fn remote(&self, name: &str) -> RepoResult<HttpRemote> {
        let config = self.config.read().expect("lock poisoned");
        let remote = config
            .remotes
            .get(name)
            .ok_or_else(|| RepoError::UnknownRemote(name.to_string()))?;
        Ok(HttpRemote::new(&remote.url, remote.auth.clone())?)
    }

    fn sync_engine(&self) -> SyncEngine {
        SyncEngine::new(self.objects.clone(), self.refs.clone())
    }

    /// Push `refs` (all branches and tags when empty) to a configured remote.
    pub async fn push(&self, remote_name: &str, refs: &[String]) -> RepoResult<PushReport> {
        let remote = self.remote(remote_name)?;
        self.push_to(&remote, remote_name, refs).await
    }

    pub async fn push_to(
        &self,
        remote: &dyn RemoteTransport,
        remote_name: &str,
        refs: &[String],
    ) -> RepoResult<PushReport> {
        Ok(self.sync_engine().push(remote, remote_name, refs).await?)
    }

    /// Pull every branch and tag from a configured remote.
    pub async fn pull(&self, remote_name: &str, options: &PullOptions) -> RepoResult<PullReport> {
        let remote = self.remote(remote_name)?;
        self.pull_from(&remote, remote_name, options).await
    }

    pub async fn pull_from(
        &self,
        remote: &dyn RemoteTransport,
        remote_name: &str,
        options: &PullOptions,
    ) -> RepoResult<PullReport> {
        let report = self.sync_engine().pull(remote, remote_name, options).await?;
        if !report.updated.is_empty() {
            if let Err(e) = self.touch() {
                warn!(error = %e, "could not update repo.json after pull");
            }
        }
        Ok(report)
    }

    /// Expose this repository to remote peers.
    pub fn host(&self) -> RepositoryHost {
        let meta = self.meta();
        RepositoryHost::new(
            self.objects.clone(),
            self.refs.clone(),
            RepoInfo {
                name: meta.name,
                description: meta.description,
                version: meta.version,
                updated: meta.updated,
            },
        )
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("dir", &self.dir)
            .field("name", &self.meta().name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_refs::RefError;
    use arx_rollback::RollbackState;
    use arx_snapshot::{BuildingRepository, EquipmentRepository, FloorRepository, InMemoryLiveStore};
    use arx_sync::LocalTransport;
    use arx_types::{Building, Equipment, FixedClock, Floor, Location3};
    use tempfile::TempDir;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::default())
    }

    fn init(dir: &TempDir, clock: Arc<FixedClock>) -> Repository {
        Repository::init_with(dir.path(), "hq", RepoConfig::default(), clock).unwrap()
    }

    fn empty_commit(repo: &Repository, message: &str) -> ObjectId {
        let empty = repo.objects().create_tree(Vec::new()).unwrap();
        repo.commit_tree(empty, message).unwrap().id
    }

    /// Building b1 with two floors and five pieces of equipment.
    fn seeded_live() -> (Arc<InMemoryLiveStore>, LiveRepositories) {
        let store = Arc::new(InMemoryLiveStore::new());
        store.create_building(&Building::new("b1", "HQ")).unwrap();
        store.create_floor(&Floor::new("f1", "b1", "Ground", 0)).unwrap();
        store.create_floor(&Floor::new("f2", "b1", "First", 1)).unwrap();
        let kinds = ["hvac", "hvac", "electrical", "plumbing", "lighting"];
        for (i, kind) in kinds.iter().enumerate() {
            let floor = if i < 3 { "f1" } else { "f2" };
            let equipment = Equipment::new(format!("e{i}"), "b1", format!("Unit {i}"), *kind)
                .on_floor(floor)
                .with_location(Location3::new(i as f64, 0.0, 0.0));
            store.create_equipment(&equipment).unwrap();
        }
        let live = LiveRepositories::from_backend(store.clone());
        (store, live)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn init_creates_layout() {
        let dir = TempDir::new().unwrap();
        let repo = init(&dir, clock());
        let arx = dir.path().join(ARX_DIR);
        assert!(arx.join(REPO_FILE).is_file());
        assert!(arx.join(CONFIG_FILE).is_file());
        assert!(arx.join("objects").is_dir());
        assert_eq!(repo.current_branch().unwrap(), "main");
        assert_eq!(repo.meta().name, "hq");
    }

    #[test]
    fn init_twice_fails() {
        let dir = TempDir::new().unwrap();
        init(&dir, clock());
        let err = Repository::init(dir.path(), "again").unwrap_err();
        assert!(matches!(err, RepoError::AlreadyInitialized(_)));
    }

    #[test]
    fn open_requires_init() {
        let dir = TempDir::new().unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(matches!(err, RepoError::NotInitialized(_)));
    }

    #[test]
    fn reopen_sees_commits_and_updated_time() {
        let dir = TempDir::new().unwrap();
        let clock = clock();
        let repo = init(&dir, clock.clone());
        clock.advance(120);
        let id = empty_commit(&repo, "Initial commit");
        drop(repo);

        let repo = Repository::open_with_clock(dir.path(), clock).unwrap();
        assert_eq!(repo.refs().resolve(HEAD).unwrap(), id);
        let meta = repo.meta();
        assert_eq!(meta.updated.timestamp() - meta.created.timestamp(), 120);
    }

    #[test]
    fn custom_default_branch() {
        let dir = TempDir::new().unwrap();
        let mut config = RepoConfig::default();
        config.core.default_branch = "trunk".into();
        let repo = Repository::init_with(dir.path(), "hq", config, clock()).unwrap();
        assert_eq!(repo.current_branch().unwrap(), "trunk");
    }

    // -----------------------------------------------------------------------
    // Commits and history
    // -----------------------------------------------------------------------

    #[test]
    fn commits_chain_through_parents() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let c1 = empty_commit(&repo, "one");
        let c2 = empty_commit(&repo, "two");
        let c3 = empty_commit(&repo, "three");

        let log = repo.log("main", 10).unwrap();
        let ids: Vec<ObjectId> = log.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c3, c2, c1]);
        assert_eq!(log[0].commit.message, "three");
        assert_eq!(log[0].commit.author, "arx");
        assert_eq!(repo.log("HEAD", 2).unwrap().len(), 2);
        assert_eq!(repo.show("main").unwrap().parents, vec![c2]);
    }

    #[test]
    fn root_commit_reflog_is_marked_initial() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        empty_commit(&repo, "first\n\nbody");
        let log = repo.refs().reflog("refs/heads/main").unwrap();
        assert_eq!(log.last().unwrap().message, "commit (initial): first");
    }

    #[test]
    fn snapshot_commit_records_change_counts() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let (_, live) = seeded_live();
        let info = repo.commit(&live, "b1", "Survey").unwrap();
        assert_eq!(info.branch.as_deref(), Some("main"));
        assert_eq!(info.parent, None);
        assert_eq!(info.changes["floors_added"], 2);
        assert_eq!(info.changes["equipment_added"], 5);

        // Nothing changed: the next commit records no counters.
        let again = repo.commit(&live, "b1", "No-op").unwrap();
        assert!(again.changes.is_empty());
        assert_eq!(again.tree, info.tree);
    }

    #[test]
    fn detached_head_commit_moves_head_only() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let c1 = empty_commit(&repo, "one");
        repo.refs().detach_head(c1, "detach").unwrap();
        let tree = repo.objects().create_blob(b"x").unwrap();
        let info = repo.commit_tree(tree, "detached").unwrap();
        assert_eq!(info.branch, None);
        assert_eq!(repo.refs().resolve(HEAD).unwrap(), info.id);
        assert_eq!(repo.refs().resolve("refs/heads/main").unwrap(), c1);
    }

    #[test]
    fn commit_survives_unwritable_repo_meta() {
        let dir = TempDir::new().unwrap();
        let repo = init(&dir, clock());
        let meta_path = dir.path().join(ARX_DIR).join(REPO_FILE);
        fs::remove_file(&meta_path).unwrap();
        // A directory where repo.json goes makes every save fail.
        fs::create_dir(&meta_path).unwrap();

        let id = empty_commit(&repo, "Initial commit");
        assert_eq!(repo.refs().resolve("refs/heads/main").unwrap(), id);
        assert_eq!(repo.show("main").unwrap().message, "Initial commit");
    }

    #[test]
    fn show_rejects_non_commits() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let blob = repo.objects().create_blob(b"x").unwrap();
        let err = repo.show(&blob.to_hex()).unwrap_err();
        assert!(matches!(err, RepoError::NotACommit(_)));
    }

    // -----------------------------------------------------------------------
    // Branches, tags, gc
    // -----------------------------------------------------------------------

    #[test]
    fn branch_checkout_and_tag() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let c1 = empty_commit(&repo, "one");
        assert_eq!(repo.create_branch("feature/x", None).unwrap(), c1);
        repo.checkout("feature/x").unwrap();
        let c2 = empty_commit(&repo, "two");
        assert_eq!(repo.refs().resolve("refs/heads/main").unwrap(), c1);
        assert_eq!(repo.branches().unwrap(), vec!["feature/x", "main"]);

        repo.create_tag("v1", "feature/x", "first release").unwrap();
        assert_eq!(repo.tags().unwrap(), vec!["v1"]);
        assert_eq!(repo.show("v1").unwrap().message, "two");
        assert_eq!(repo.refs().resolve_target("v1").unwrap(), c2);

        assert!(matches!(
            repo.delete_branch("feature/x"),
            Err(RepoError::Refs(RefError::DeleteCurrentBranch { .. }))
        ));
        repo.checkout("main").unwrap();
        repo.delete_branch("feature/x").unwrap();
        repo.delete_tag("v1").unwrap();
        assert_eq!(repo.branches().unwrap(), vec!["main"]);
    }

    #[test]
    fn gc_removes_only_unreachable_objects() {
        let dir = TempDir::new().unwrap();
        let repo = init(&dir, clock());
        let (_, live) = seeded_live();
        repo.commit(&live, "b1", "Survey").unwrap();
        let orphan = repo.objects().create_blob(b"orphan").unwrap();

        let preview = repo.gc(true).unwrap();
        assert_eq!(preview.removed, vec![orphan]);
        assert!(repo.objects().exists(&orphan).unwrap());

        let report = repo.gc(false).unwrap();
        assert_eq!(report.removed, vec![orphan]);
        assert!(!repo.objects().exists(&orphan).unwrap());
        assert!(repo.log("HEAD", 1).is_ok());
    }

    // -----------------------------------------------------------------------
    // Remotes
    // -----------------------------------------------------------------------

    #[test]
    fn remotes_are_persisted() {
        let dir = TempDir::new().unwrap();
        let repo = init(&dir, clock());
        repo.add_remote(
            "origin",
            RemoteConfig {
                url: "http://127.0.0.1:7420".into(),
                auth: arx_sync::AuthMethod::bearer("t"),
            },
        )
        .unwrap();
        drop(repo);

        let repo = Repository::open(dir.path()).unwrap();
        assert_eq!(repo.remote("origin").unwrap().base_url(), "http://127.0.0.1:7420");
        assert!(matches!(repo.remote("upstream"), Err(RepoError::UnknownRemote(_))));
        repo.remove_remote("origin").unwrap();
        assert!(repo.config().remotes.is_empty());
    }

    #[test]
    fn bad_remote_url_is_refused() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let err = repo
            .add_remote(
                "origin",
                RemoteConfig {
                    url: "ftp://example.com".into(),
                    auth: Default::default(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RepoError::Sync(_)));
    }

    #[tokio::test]
    async fn push_and_pull_between_repositories() {
        let a_dir = TempDir::new().unwrap();
        let b_dir = TempDir::new().unwrap();
        let a = init(&a_dir, clock());
        let b = init(&b_dir, clock());
        let (_, live) = seeded_live();
        let commit = a.commit(&live, "b1", "Survey").unwrap();

        let b_remote = LocalTransport::new(Arc::new(b.host()));
        let pushed = a.push_to(&b_remote, "origin", &[]).await.unwrap();
        assert!(pushed.is_success());
        assert_eq!(b.refs().resolve("refs/heads/main").unwrap(), commit.id);

        let c_dir = TempDir::new().unwrap();
        let c = init(&c_dir, clock());
        let pulled = c
            .pull_from(&b_remote, "origin", &PullOptions::default())
            .await
            .unwrap();
        assert_eq!(pulled.objects_fetched, pushed.objects_sent);
        assert_eq!(c.diff("main", &commit.id.to_hex()).unwrap().summary.total_changes, 0);
    }

    #[tokio::test]
    async fn push_to_unknown_remote_fails() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let err = repo.push("origin", &[]).await.unwrap_err();
        assert!(matches!(err, RepoError::UnknownRemote(_)));
    }

    // -----------------------------------------------------------------------
    // End to end
    // -----------------------------------------------------------------------

    #[test]
    fn branch_diff_and_rollback_round_trip() {
        let dir = TempDir::new().unwrap();
        let clock = clock();
        let repo = init(&dir, clock.clone());

        let initial = empty_commit(&repo, "Initial commit");
        repo.create_branch("feature/x", None).unwrap();
        repo.checkout("feature/x").unwrap();

        let (store, live) = seeded_live();
        clock.advance(60);
        let second = repo.commit(&live, "b1", "Add floors and equipment").unwrap();
        assert_eq!(second.changes["total_changes"], 7);

        let diff = repo.diff("main", "feature/x").unwrap();
        assert_eq!(diff.from, "main");
        assert_eq!(diff.summary.floors_added, 2);
        assert_eq!(diff.summary.equipment_added, 5);
        assert_eq!(diff.summary.total_changes, 7);

        // Back on main, live data drifts away from the feature snapshot.
        repo.checkout("main").unwrap();
        store.delete_equipment("e0").unwrap();
        store.delete_floor("f2").unwrap();

        let options = RollbackOptions {
            validate_after: true,
            create_version: true,
            ..RollbackOptions::default()
        };
        let result = repo.rollback(&live, "b1", "feature/x", &options);
        assert_eq!(result.state, RollbackState::Done, "{:?}", result.error);
        assert_eq!(result.previous_version, Some(initial));
        assert_eq!(result.total_changes(), 7);
        let validation = result.validation.as_ref().unwrap();
        assert!(validation.valid);
        assert_eq!(validation.floor_count, 2);
        assert_eq!(validation.equipment_count, 5);
        assert_eq!(store.floors_by_building("b1").unwrap().len(), 2);
        assert_eq!(store.equipment_by_building("b1").unwrap().len(), 5);

        // main moved onto the feature tree; feature/x stayed put.
        let main = repo.show("main").unwrap();
        assert_eq!(Some(repo.refs().resolve("refs/heads/main").unwrap()), result.new_version);
        assert_eq!(main.tree, second.tree);
        assert_eq!(main.parents, vec![initial]);
        assert_eq!(repo.current_branch().unwrap(), "main");
        assert_eq!(repo.refs().resolve("refs/heads/feature/x").unwrap(), second.id);
    }

    #[test]
    fn recorded_rollback_advances_branch() {
        let repo = Repository::in_memory("hq", clock()).unwrap();
        let (store, live) = seeded_live();
        let v1 = repo.commit(&live, "b1", "Survey").unwrap();
        repo.create_tag("v1", "HEAD", "").unwrap();
        store.delete_equipment("e4").unwrap();
        let v2 = repo.commit(&live, "b1", "Removed lighting").unwrap();
        assert_eq!(v2.changes["equipment_removed"], 1);

        let result = repo.rollback(&live, "b1", "v1", &RollbackOptions::full(""));
        assert!(result.is_success());
        let head = repo.show("HEAD").unwrap();
        assert_eq!(head.tree, v1.tree);
        assert_eq!(head.parents, vec![v2.id]);
        assert_eq!(head.message, "Rollback to v1");
        assert_eq!(store.equipment_by_building("b1").unwrap().len(), 5);
    }
}
