//! Filesystem reference store.
//!
//! Layout under the repository directory:
//!
//! ```text
//! HEAD                     ref: refs/heads/main
//! refs/heads/<branch>      <64 hex>
//! refs/tags/<tag>
//! refs/remotes/<remote>/<branch>
//! logs/<ref path>          old new timestamp message   (one line per update)
//! branches/<branch>.json   policy record
//! ```
//!
//! Every ref and record write goes through a temporary file in the target
//! directory followed by a rename, so a crash mid-write leaves the previous
//! value in place.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arx_types::{Clock, SystemClock};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::branch::Branch;
use crate::error::{RefError, Result};
use crate::names::{validate_branch_name, validate_ref_path};
use crate::traits::{RefStore, MAX_SYMBOLIC_DEPTH};
use crate::types::{RefValue, ReflogEntry};

/// Reference store backed by plain files.
pub struct FsRefStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    repository: String,
    symbolic_limit: usize,
    // Serializes writers so compare-and-swap is atomic within the process.
    write_lock: Mutex<()>,
}

impl FsRefStore {
    /// Open a ref store rooted at `root` (the repository directory).
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    /// Open with an injected clock.
    pub fn with_clock(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
            repository: String::new(),
            symbolic_limit: MAX_SYMBOLIC_DEPTH,
            write_lock: Mutex::new(()),
        }
    }

    /// Name recorded on branch records.
    pub fn with_repository(mut self, name: impl Into<String>) -> Self {
        self.repository = name.into();
        self
    }

    /// Override the symbolic hop limit.
    pub fn with_symbolic_limit(mut self, limit: usize) -> Self {
        self.symbolic_limit = limit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn log_path(&self, name: &str) -> PathBuf {
        self.root.join("logs").join(name)
    }

    fn branch_path(&self, name: &str) -> PathBuf {
        self.root.join("branches").join(format!("{name}.json"))
    }

    fn write_unlocked(&self, name: &str, value: &RefValue) -> Result<()> {
        if self.collides(&self.ref_path(name)) {
            return Err(RefError::AlreadyExists {
                name: name.to_string(),
            });
        }
        atomic_write(&self.ref_path(name), format!("{value}\n").as_bytes())?;
        debug!(name, value = %value, "ref write");
        Ok(())
    }

    /// True when `path` is a directory, or a file sits where one of its
    /// parent directories would go (`refs/heads/feature` against
    /// `refs/heads/feature/x`).
    fn collides(&self, path: &Path) -> bool {
        path.is_dir()
            || path
                .ancestors()
                .skip(1)
                .take_while(|dir| *dir != self.root.as_path())
                .any(Path::is_file)
    }

    /// Remove directories left empty under `stop` after deleting `path`.
    fn prune_empty_parents(&self, path: &Path, stop: &Path) {
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == stop || !current.starts_with(stop) {
                break;
            }
            // Fails on the first non-empty directory.
            if fs::remove_dir(current).is_err() {
                break;
            }
            debug!(dir = %current.display(), "pruned empty ref directory");
            dir = current.parent();
        }
    }

    /// `refs/<namespace>` for a full ref path; nothing above it is pruned.
    fn namespace_dir(&self, name: &str) -> Option<PathBuf> {
        let mut parts = name.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(refs), Some(namespace), Some(_)) => Some(self.root.join(refs).join(namespace)),
            _ => None,
        }
    }

    /// Collect relative file names under `dir`, joined with `/`.
    fn walk_names(&self, dir: &Path, prefix: &str) -> Result<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1) {
            let entry = entry.map_err(|e| RefError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            // In-flight temp files.
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            names.push(format!("{prefix}{}", parts.join("/")));
        }
        names.sort();
        Ok(names)
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        RefError::Io(std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"))
    })?;
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RefError::Io(e.error))?;
    Ok(())
}

impl RefStore for FsRefStore {
    fn read(&self, name: &str) -> Result<Option<RefValue>> {
        validate_ref_path(name)?;
        match fs::read_to_string(self.ref_path(name)) {
            Ok(raw) => RefValue::parse(name, &raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // `refs/heads/feature` read while `refs/heads/feature/x` exists,
            // or the reverse.
            Err(e) if self.collides(&self.ref_path(name)) => {
                debug!(name, error = %e, "ref path is a directory");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, value: &RefValue) -> Result<()> {
        validate_ref_path(name)?;
        let _guard = self.write_lock.lock().expect("lock poisoned");
        self.write_unlocked(name, value)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        validate_ref_path(name)?;
        let _guard = self.write_lock.lock().expect("lock poisoned");
        let path = self.ref_path(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                if let Some(stop) = self.namespace_dir(name) {
                    self.prune_empty_parents(&path, &stop);
                }
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn names(&self) -> Result<Vec<String>> {
        self.walk_names(&self.root.join("refs"), "refs/")
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&RefValue>,
        new: &RefValue,
        message: &str,
    ) -> Result<()> {
        validate_ref_path(name)?;
        let guard = self.write_lock.lock().expect("lock poisoned");
        let current = self.read(name)?;
        if current.as_ref() != expected {
            return Err(RefError::Conflict {
                name: name.to_string(),
                expected: expected.map_or_else(|| "(none)".to_string(), ToString::to_string),
                actual: current.map_or_else(|| "(none)".to_string(), |v| v.to_string()),
            });
        }
        self.write_unlocked(name, new)?;
        drop(guard);
        self.record(name, current, Some(new.clone()), message);
        Ok(())
    }

    fn append_log(&self, name: &str, entry: &ReflogEntry) -> Result<()> {
        let path = self.log_path(name);
        // Reflogs outlive their refs, so an old log can occupy the path.
        if self.collides(&path) {
            return Err(RefError::AlreadyExists {
                name: format!("logs/{name}"),
            });
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", entry.to_line())?;
        Ok(())
    }

    fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>> {
        validate_ref_path(name)?;
        let path = self.log_path(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(_) if self.collides(&path) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let entry = ReflogEntry::parse_line(line);
                if entry.is_none() {
                    warn!(name, line, "skipping malformed reflog line");
                }
                entry
            })
            .collect())
    }

    fn logged_names(&self) -> Result<Vec<String>> {
        self.walk_names(&self.root.join("logs"), "")
    }

    fn save_branch(&self, branch: &Branch) -> Result<()> {
        validate_branch_name(&branch.name)?;
        let bytes = serde_json::to_vec_pretty(branch)?;
        atomic_write(&self.branch_path(&branch.name), &bytes)
    }

    fn load_branch(&self, name: &str) -> Result<Option<Branch>> {
        validate_branch_name(name)?;
        match fs::read(self.branch_path(name)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_branch(&self, name: &str) -> Result<bool> {
        validate_branch_name(name)?;
        let path = self.branch_path(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                self.prune_empty_parents(&path, &self.root.join("branches"));
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn prepare(&self) -> Result<()> {
        for dir in ["refs/heads", "refs/tags", "refs/remotes", "logs", "branches"] {
            fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    fn repository(&self) -> &str {
        &self.repository
    }

    fn symbolic_limit(&self) -> usize {
        self.symbolic_limit
    }
}

impl std::fmt::Debug for FsRefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsRefStore")
            .field("root", &self.root)
            .field("repository", &self.repository)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_types::{FixedClock, ObjectId};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FsRefStore {
        let s = FsRefStore::with_clock(dir.path(), Arc::new(FixedClock::default()))
            .with_repository("hq");
        s.init("main").unwrap();
        s
    }

    fn oid(seed: &str) -> ObjectId {
        ObjectId::from_bytes(seed.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Layout and raw access
    // -----------------------------------------------------------------------

    #[test]
    fn init_creates_layout_and_symbolic_head() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        for sub in ["refs/heads", "refs/tags", "refs/remotes", "logs"] {
            assert!(dir.path().join(sub).is_dir(), "{sub}");
        }
        let head = fs::read_to_string(dir.path().join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
        assert_eq!(s.current_branch().unwrap(), "main");
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        s.checkout("main").unwrap();
        s.init("develop").unwrap();
        assert_eq!(s.current_branch().unwrap(), "main");
    }

    #[test]
    fn update_writes_file_and_reflog() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit: one").unwrap();
        s.update("refs/heads/main", oid("c2").into(), "commit: two").unwrap();

        let raw = fs::read_to_string(dir.path().join("refs/heads/main")).unwrap();
        assert_eq!(raw.trim(), oid("c2").to_hex());

        let log = s.reflog("refs/heads/main").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].old, None);
        assert_eq!(log[1].old, Some(oid("c1").into()));
        assert_eq!(log[1].new, Some(oid("c2").into()));
        assert_eq!(log[1].timestamp, 1_704_067_200);
        assert_eq!(log[1].message, "commit: two");
    }

    #[test]
    fn reflog_failure_does_not_fail_update() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        // A plain file where the log directory should be.
        fs::write(dir.path().join("logs/refs"), b"blocker").unwrap();
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        assert_eq!(s.resolve("refs/heads/main").unwrap(), oid("c1"));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("refs/heads"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["main".to_string()]);
    }

    #[test]
    fn corrupt_ref_is_reported() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        fs::write(dir.path().join("refs/heads/broken"), b"zzz").unwrap();
        assert!(matches!(
            s.read("refs/heads/broken"),
            Err(RefError::CorruptRef { .. })
        ));
    }

    #[test]
    fn path_traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert!(matches!(
            s.update("refs/../../etc/passwd", oid("x").into(), "evil"),
            Err(RefError::InvalidName { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Symbolic resolution
    // -----------------------------------------------------------------------

    fn chain(s: &FsRefStore, symbolic: usize) -> String {
        s.update("refs/heads/base", oid("target").into(), "base").unwrap();
        let mut target = "refs/heads/base".to_string();
        for i in 0..symbolic {
            let name = format!("refs/heads/link{i}");
            s.update(&name, RefValue::Symbolic(target), "link").unwrap();
            target = name;
        }
        target
    }

    #[test]
    fn ten_symbolic_hops_resolve() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let top = chain(&s, 10);
        assert_eq!(s.resolve(&top).unwrap(), oid("target"));
    }

    #[test]
    fn eleven_symbolic_hops_fail() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let top = chain(&s, 11);
        assert!(matches!(
            s.resolve(&top),
            Err(RefError::TooManySymbolicLevels { limit: 10, .. })
        ));
    }

    #[test]
    fn symbolic_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/a", RefValue::Symbolic("refs/heads/b".into()), "a").unwrap();
        s.update("refs/heads/b", RefValue::Symbolic("refs/heads/a".into()), "b").unwrap();
        assert!(matches!(
            s.resolve("refs/heads/a"),
            Err(RefError::TooManySymbolicLevels { .. })
        ));
    }

    #[test]
    fn resolve_unborn_head_is_not_found() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert!(matches!(
            s.resolve("HEAD"),
            Err(RefError::NotFound { name }) if name == "refs/heads/main"
        ));
    }

    // -----------------------------------------------------------------------
    // Branches and tags
    // -----------------------------------------------------------------------

    #[test]
    fn create_branch_from_ref_and_from_hex() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();

        assert_eq!(s.create_branch("feature/x", "main").unwrap(), oid("c1"));
        let hex = oid("c9").to_hex();
        assert_eq!(s.create_branch("scan/l2", &hex).unwrap(), oid("c9"));
        assert!(matches!(
            s.create_branch("feature/x", "main"),
            Err(RefError::AlreadyExists { .. })
        ));
        assert!(matches!(
            s.create_branch("other", "no-such-thing"),
            Err(RefError::InvalidTarget { .. })
        ));

        let record = s.branch("feature/x").unwrap();
        assert_eq!(record.repository, "hq");
        assert_eq!(record.base_commit, oid("c1"));
        assert!(dir.path().join("branches/feature/x.json").is_file());
    }

    #[test]
    fn delete_branch_rules() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        s.create_branch("feature/x", "main").unwrap();
        s.create_branch("release/1", "main").unwrap();

        assert!(matches!(
            s.delete_branch("main"),
            Err(RefError::DeleteCurrentBranch { .. })
        ));
        assert!(matches!(
            s.delete_branch("release/1"),
            Err(RefError::ProtectedBranch { .. })
        ));
        s.delete_branch("feature/x").unwrap();
        assert!(s.read("refs/heads/feature/x").unwrap().is_none());
        assert!(s.load_branch("feature/x").unwrap().is_none());
        assert!(matches!(
            s.delete_branch("feature/x"),
            Err(RefError::NotFound { .. })
        ));
    }

    #[test]
    fn nested_branch_name_reusable_after_delete() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        s.create_branch("feature/x", "main").unwrap();
        s.delete_branch("feature/x").unwrap();
        assert!(!dir.path().join("refs/heads/feature").exists());
        assert!(!dir.path().join("branches/feature").exists());
        assert!(dir.path().join("refs/heads").is_dir());

        assert_eq!(s.create_branch("feature", "main").unwrap(), oid("c1"));
        assert_eq!(s.resolve("refs/heads/feature").unwrap(), oid("c1"));
        assert_eq!(s.branch("feature").unwrap().base_commit, oid("c1"));
        // The old nested reflog still holds the path, so the new one is skipped.
        assert!(s.reflog("refs/heads/feature").unwrap().is_empty());
        assert_eq!(s.reflog("refs/heads/feature/x").unwrap().len(), 2);
        assert_eq!(s.branches().unwrap(), vec!["feature", "main"]);
    }

    #[test]
    fn file_and_directory_names_collide() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        s.create_branch("feature/x", "main").unwrap();
        s.create_branch("feature/y", "main").unwrap();
        s.delete_branch("feature/x").unwrap();
        // feature/y keeps the directory alive.
        assert!(dir.path().join("refs/heads/feature").is_dir());
        assert!(s.read("refs/heads/feature").unwrap().is_none());
        assert!(matches!(
            s.create_branch("feature", "main"),
            Err(RefError::AlreadyExists { .. })
        ));

        s.create_branch("scan", "main").unwrap();
        assert!(s.read("refs/heads/scan/l2").unwrap().is_none());
        assert!(matches!(
            s.create_branch("scan/l2", "main"),
            Err(RefError::AlreadyExists { .. })
        ));
        assert!(matches!(
            s.update("refs/heads/scan/l2", oid("c2").into(), "commit"),
            Err(RefError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn tags_are_create_once_and_keep_message() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        s.create_tag("v1", "main", "first handover").unwrap();
        assert!(matches!(
            s.create_tag("v1", "main", ""),
            Err(RefError::AlreadyExists { .. })
        ));
        assert_eq!(s.reflog("refs/tags/v1").unwrap()[0].message, "tag: first handover");
        assert_eq!(s.tags_pointing_at(&oid("c1")).unwrap(), vec!["v1".to_string()]);
        s.delete_tag("v1").unwrap();
        assert!(s.tags().unwrap().is_empty());
        assert!(dir.path().join("refs/tags").is_dir());
    }

    #[test]
    fn checkout_and_detached_head() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "commit").unwrap();
        s.create_branch("feature/x", "main").unwrap();
        s.checkout("feature/x").unwrap();
        assert_eq!(s.current_branch().unwrap(), "feature/x");
        assert_eq!(
            s.reflog("HEAD").unwrap().last().unwrap().message,
            "checkout: moving from main to feature/x"
        );

        s.detach_head(oid("c1"), "detach").unwrap();
        assert!(matches!(s.current_branch(), Err(RefError::DetachedHead)));
        assert!(matches!(s.checkout("nope"), Err(RefError::NotFound { .. })));
    }

    // -----------------------------------------------------------------------
    // Listing, CAS, GC roots
    // -----------------------------------------------------------------------

    #[test]
    fn list_by_glob_and_substring() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "c").unwrap();
        s.create_branch("feature/x", "main").unwrap();
        s.create_tag("v1", "main", "").unwrap();

        let all: Vec<String> = s.list("").unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(all, vec!["refs/heads/feature/x", "refs/heads/main", "refs/tags/v1"]);

        let heads: Vec<String> = s.list("refs/heads/*").unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(heads.len(), 2);

        let feature = s.list("feature").unwrap();
        assert_eq!(feature.len(), 1);
        assert_eq!(feature[0].1, RefValue::Direct(oid("c1")));
    }

    #[test]
    fn compare_and_swap_detects_races() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let name = "refs/heads/main";
        s.compare_and_swap(name, None, &oid("c1").into(), "c1").unwrap();
        s.compare_and_swap(name, Some(&oid("c1").into()), &oid("c2").into(), "c2")
            .unwrap();
        let err = s
            .compare_and_swap(name, Some(&oid("c1").into()), &oid("c3").into(), "stale")
            .unwrap_err();
        assert!(matches!(err, RefError::Conflict { .. }));
        assert_eq!(s.resolve(name).unwrap(), oid("c2"));
    }

    #[test]
    fn concurrent_cas_exactly_one_winner() {
        use std::thread;

        let dir = TempDir::new().unwrap();
        let s = Arc::new(store(&dir));
        s.update("refs/heads/main", oid("base").into(), "base").unwrap();
        let base: RefValue = oid("base").into();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = Arc::clone(&s);
                let base = base.clone();
                thread::spawn(move || {
                    s.compare_and_swap(
                        "refs/heads/main",
                        Some(&base),
                        &oid(&format!("w{i}")).into(),
                        "race",
                    )
                    .is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn gc_roots_include_reflog_history() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.update("refs/heads/main", oid("c1").into(), "c1").unwrap();
        s.update("refs/heads/main", oid("c2").into(), "c2").unwrap();
        s.create_tag("v1", "main", "").unwrap();
        s.delete_tag("v1").unwrap();

        let roots = s.gc_roots().unwrap();
        assert!(roots.contains(&oid("c1")));
        assert!(roots.contains(&oid("c2")));
        assert_eq!(roots.len(), 2);
    }
}
