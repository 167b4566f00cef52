//! Content-hash baselines for projects that are not git working trees.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, Permissions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::ChangeError;

use super::targets::{all_targets, GenerateTargetDefinition};
use super::types::{ChangeKind, ChangeSource, GenerateChangeSet, GenerateFileChange};

/// Project-relative directory holding snapshot baselines.
pub const SNAPSHOT_DIR: &str = ".gpt-creator/tmp/generate-snapshots";

pub const NO_SNAPSHOT_WARNING: &str =
    "No generation snapshot captured yet; diffs are unavailable until a snapshot is taken.";

/// A captured baseline of some targets of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    pub project: PathBuf,
    /// Timestamped directory holding every target baseline.
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Target key to its baseline directory.
    pub targets: BTreeMap<String, PathBuf>,
}

/// Registry of the current snapshot of each project.
///
/// At most one snapshot directory is kept per project: registering a new
/// record deletes the directory of the record it replaces.
#[derive(Debug)]
pub struct SnapshotStore {
    records: Mutex<HashMap<PathBuf, SnapshotRecord>>,
    targets: &'static [GenerateTargetDefinition],
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_targets(all_targets())
    }

    pub fn with_targets(targets: &'static [GenerateTargetDefinition]) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            targets,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, SnapshotRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies the paths of every target in `target_keys` into a fresh
    /// snapshot directory and makes it the project's current baseline.
    pub fn prepare(
        &self,
        project: &Path,
        target_keys: &[&str],
    ) -> Result<SnapshotRecord, ChangeError> {
        let defs = self.resolve(target_keys)?;

        let created_at = Utc::now().trunc_subsecs(6);
        let stamp = created_at.format(STAMP_FORMAT).to_string();
        let root = project.join(SNAPSHOT_DIR).join(stamp);
        fs::create_dir_all(&root).map_err(|e| ChangeError::io(&root, e))?;

        let mut record = SnapshotRecord {
            project: project.to_path_buf(),
            root: root.clone(),
            created_at,
            targets: BTreeMap::new(),
        };
        for def in defs {
            let baseline = root.join(def.key);
            if let Err(err) = copy_target(project, &baseline, def) {
                if let Err(cleanup) = fs::remove_dir_all(&root) {
                    log::warn!("failed to remove partial snapshot {}: {cleanup}", root.display());
                }
                return Err(err);
            }
            record.targets.insert(def.key.to_string(), baseline);
        }

        log::info!(
            "captured snapshot of [{}] at {}",
            target_keys.join(", "),
            root.display()
        );
        self.register(record.clone());
        Ok(record)
    }

    /// Adds baselines for `target_keys` to the project's current snapshot.
    ///
    /// Targets that already have a baseline keep it, so a generation that is
    /// still running is compared against its original state. Without a
    /// current snapshot this is [`SnapshotStore::prepare`].
    pub fn extend(
        &self,
        project: &Path,
        target_keys: &[&str],
    ) -> Result<SnapshotRecord, ChangeError> {
        let Some(mut record) = self.current(project) else {
            return self.prepare(project, target_keys);
        };
        let defs = self.resolve(target_keys)?;
        let mut added: Vec<PathBuf> = Vec::new();
        for def in defs {
            if record.targets.contains_key(def.key) {
                continue;
            }
            let baseline = record.root.join(def.key);
            if let Err(err) = copy_target(project, &baseline, def) {
                for dir in added.iter().chain(std::iter::once(&baseline)) {
                    remove_snapshot_dir(dir);
                }
                return Err(err);
            }
            record.targets.insert(def.key.to_string(), baseline.clone());
            added.push(baseline);
        }
        if !added.is_empty() {
            log::info!(
                "extended snapshot {} with {} target(s)",
                record.root.display(),
                added.len()
            );
        }
        self.register(record.clone());
        Ok(record)
    }

    fn resolve(
        &self,
        target_keys: &[&str],
    ) -> Result<Vec<&'static GenerateTargetDefinition>, ChangeError> {
        target_keys
            .iter()
            .map(|key| {
                self.targets
                    .iter()
                    .find(|t| t.key == *key)
                    .ok_or_else(|| ChangeError::UnknownTarget((*key).to_string()))
            })
            .collect()
    }

    /// Makes `record` the current snapshot of its project.
    pub fn register(&self, record: SnapshotRecord) {
        let key = registry_key(&record.project);
        let new_root = record.root.clone();
        let previous = self.lock().insert(key, record);
        if let Some(previous) = previous {
            if previous.root != new_root {
                remove_snapshot_dir(&previous.root);
            }
        }
    }

    pub fn current(&self, project: &Path) -> Option<SnapshotRecord> {
        self.lock().get(&registry_key(project)).cloned()
    }

    /// Forgets the project's snapshot and deletes its directory.
    pub fn discard(&self, project: &Path) -> bool {
        let removed = self.lock().remove(&registry_key(project));
        match removed {
            Some(record) => {
                remove_snapshot_dir(&record.root);
                true
            }
            None => false,
        }
    }

    /// Registers the newest snapshot directory found on disk, for a process
    /// started after the snapshot was captured. Older directories are removed.
    pub fn restore_latest(&self, project: &Path) -> Result<Option<SnapshotRecord>, ChangeError> {
        if let Some(record) = self.current(project) {
            return Ok(Some(record));
        }
        let dir = project.join(SNAPSHOT_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ChangeError::io(&dir, err)),
        };
        let mut found: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ChangeError::io(&dir, e))?;
            let path = entry.path();
            let stamp = entry.file_name().to_string_lossy().into_owned();
            match parse_stamp(&stamp) {
                Some(created_at) if path.is_dir() => found.push((created_at, path)),
                _ => log::debug!("ignoring {} in snapshot directory", path.display()),
            }
        }
        found.sort();
        let Some((created_at, root)) = found.pop() else {
            return Ok(None);
        };
        for (_, stale) in found {
            remove_snapshot_dir(&stale);
        }

        let targets = self
            .targets
            .iter()
            .map(|def| (def.key.to_string(), root.join(def.key)))
            .filter(|(_, baseline)| baseline.is_dir())
            .collect();
        let record = SnapshotRecord {
            project: project.to_path_buf(),
            root,
            created_at,
            targets,
        };
        log::info!("restored snapshot {}", record.root.display());
        self.register(record.clone());
        Ok(Some(record))
    }

    /// Baseline copy of `rel_path` for `target_key`, if one was captured.
    pub fn baseline_file(&self, project: &Path, target_key: &str, rel_path: &str) -> Option<PathBuf> {
        self.current(project)?
            .targets
            .get(target_key)
            .map(|baseline| baseline.join(rel_path))
    }

    /// Compares the live project against its current snapshot.
    pub fn collect_changes(
        &self,
        project: &Path,
        targets: &[GenerateTargetDefinition],
    ) -> Result<GenerateChangeSet, ChangeError> {
        let Some(record) = self.current(project) else {
            return Ok(GenerateChangeSet::empty(ChangeSource::Snapshot)
                .with_warning(NO_SNAPSHOT_WARNING));
        };
        let scoped: Vec<(&GenerateTargetDefinition, &PathBuf)> = targets
            .iter()
            .filter_map(|def| record.targets.get(def.key).map(|baseline| (def, baseline)))
            .collect();

        let results = thread::scope(|scope| {
            let handles: Vec<_> = scoped
                .iter()
                .map(|(def, baseline)| scope.spawn(move || compare_target(project, baseline, def)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|_| Err(worker_panicked(project))))
                .collect::<Vec<_>>()
        });

        let mut changes = Vec::new();
        for result in results {
            changes.extend(result?);
        }
        let mut set = GenerateChangeSet::from_changes(ChangeSource::Snapshot, changes, targets);
        set.snapshot_root = Some(record.root);
        set.snapshot_taken_at = Some(record.created_at);
        Ok(set)
    }
}

const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";

fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn registry_key(project: &Path) -> PathBuf {
    fs::canonicalize(project).unwrap_or_else(|_| project.to_path_buf())
}

fn remove_snapshot_dir(root: &Path) {
    match fs::remove_dir_all(root) {
        Ok(()) => log::debug!("removed previous snapshot {}", root.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => log::warn!("failed to remove snapshot {}: {err}", root.display()),
    }
}

fn worker_panicked(project: &Path) -> ChangeError {
    ChangeError::Walk {
        path: project.to_path_buf(),
        message: "comparison worker panicked".to_string(),
    }
}

fn walk_error(path: &Path, err: walkdir::Error) -> ChangeError {
    ChangeError::Walk {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn copy_target(
    project: &Path,
    baseline: &Path,
    def: &GenerateTargetDefinition,
) -> Result<(), ChangeError> {
    fs::create_dir_all(baseline).map_err(|e| ChangeError::io(baseline, e))?;
    for rel in def.paths() {
        let src = project.join(rel);
        let meta = match fs::symlink_metadata(&src) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(ChangeError::io(&src, err)),
        };
        let dst = baseline.join(rel);
        if meta.is_dir() {
            copy_tree(&src, &dst)?;
        } else {
            copy_entry(&src, &dst, meta.file_type())?;
        }
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), ChangeError> {
    // Directory modes are applied last so read-only directories can be filled.
    let mut dir_modes: Vec<(PathBuf, Permissions)> = Vec::new();
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| ChangeError::Walk {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ChangeError::io(&target, e))?;
            let meta = entry.metadata().map_err(|e| walk_error(entry.path(), e))?;
            dir_modes.push((target, meta.permissions()));
        } else {
            copy_entry(entry.path(), &target, entry.file_type())?;
        }
    }
    for (dir, perms) in dir_modes.into_iter().rev() {
        fs::set_permissions(&dir, perms).map_err(|e| ChangeError::io(&dir, e))?;
    }
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, file_type: fs::FileType) -> Result<(), ChangeError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| ChangeError::io(parent, e))?;
    }
    if file_type.is_symlink() {
        let link = fs::read_link(src).map_err(|e| ChangeError::io(src, e))?;
        return create_symlink(&link, dst).map_err(|e| ChangeError::io(dst, e));
    }
    fs::copy(src, dst).map_err(|e| ChangeError::io(src, e))?;
    Ok(())
}

#[cfg(unix)]
fn create_symlink(link: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn create_symlink(link: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(link, dst)
}

#[derive(Debug, Clone, Copy)]
enum FileHash {
    Digest([u8; 32]),
    Unreadable,
}

#[derive(Debug, Default)]
struct HashPair {
    base: Option<FileHash>,
    live: Option<FileHash>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Base,
    Live,
}

type HashTable = Mutex<HashMap<String, HashPair>>;

fn compare_target(
    project: &Path,
    baseline: &Path,
    def: &GenerateTargetDefinition,
) -> Result<Vec<GenerateFileChange>, ChangeError> {
    let table: HashTable = Mutex::new(HashMap::new());
    thread::scope(|scope| {
        let base = scope.spawn(|| hash_tree(baseline, def, Side::Base, &table));
        let live = scope.spawn(|| hash_tree(project, def, Side::Live, &table));
        let base = base.join().unwrap_or_else(|_| Err(worker_panicked(baseline)));
        let live = live.join().unwrap_or_else(|_| Err(worker_panicked(project)));
        base.and(live)
    })?;

    let table = table.into_inner().unwrap_or_else(PoisonError::into_inner);
    let mut changes: Vec<GenerateFileChange> = table
        .into_iter()
        .filter_map(|(path, pair)| {
            let kind = match (pair.base, pair.live) {
                (Some(_), None) => ChangeKind::Deleted,
                (None, Some(_)) => ChangeKind::Added,
                (Some(FileHash::Digest(a)), Some(FileHash::Digest(b))) if a == b => return None,
                (Some(_), Some(_)) => ChangeKind::Modified,
                (None, None) => return None,
            };
            Some(GenerateFileChange::new(path, kind, def.key, ChangeSource::Snapshot))
        })
        .collect();
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(changes)
}

fn hash_tree(
    root: &Path,
    def: &GenerateTargetDefinition,
    side: Side,
    table: &HashTable,
) -> Result<(), ChangeError> {
    for rel in def.paths() {
        let start = root.join(rel);
        match fs::symlink_metadata(&start) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(ChangeError::io(&start, err)),
        }
        for entry in WalkDir::new(&start).follow_links(false) {
            let entry = entry.map_err(|e| walk_error(&start, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel_path) = entry.path().strip_prefix(root) else {
                continue;
            };
            let key = rel_key(rel_path);
            let hash = hash_file(entry.path());
            let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
            let pair = table.entry(key).or_default();
            match side {
                Side::Base => pair.base = Some(hash),
                Side::Live => pair.live = Some(hash),
            }
        }
    }
    Ok(())
}

fn rel_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn hash_file(path: &Path) -> FileHash {
    let digest = File::open(path).and_then(|mut file| {
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hasher.finalize())
    });
    match digest {
        Ok(digest) => FileHash::Digest(digest.into()),
        Err(err) => {
            log::debug!("could not hash {}: {err}", path.display());
            FileHash::Unreadable
        }
    }
}
