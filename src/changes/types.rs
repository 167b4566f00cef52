use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::targets::{target_for_path, GenerateTargetDefinition};

/// How a file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        }
    }

    /// Single letter used in compact listings.
    pub const fn short(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which collector produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    Git,
    Snapshot,
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => f.write_str("git"),
            Self::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// One changed file inside a generation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateFileChange {
    /// Project-relative path, `/` separated.
    pub path: String,
    /// Original path for renames.
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    /// Human label, e.g. "untracked" or "renamed from x".
    pub status_label: String,
    pub target_key: String,
    pub source: ChangeSource,
}

impl GenerateFileChange {
    pub fn new(
        path: impl Into<String>,
        kind: ChangeKind,
        target_key: impl Into<String>,
        source: ChangeSource,
    ) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            kind,
            status_label: kind.as_str().to_string(),
            target_key: target_key.into(),
            source,
        }
    }

    pub fn with_old_path(mut self, old_path: impl Into<String>) -> Self {
        let old_path = old_path.into();
        self.status_label = format!("renamed from {old_path}");
        self.old_path = Some(old_path);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.status_label = label.into();
        self
    }
}

/// Per-kind tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl ChangeCounts {
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a GenerateFileChange>) -> Self {
        files.into_iter().fold(Self::default(), |mut counts, file| {
            counts.record(file.kind);
            counts
        })
    }

    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Added => self.added += 1,
            ChangeKind::Modified => self.modified += 1,
            ChangeKind::Deleted => self.deleted += 1,
            ChangeKind::Renamed => self.renamed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted + self.renamed
    }

    /// Short human summary such as "2 added, 1 modified".
    pub fn summary(&self) -> String {
        let parts: Vec<String> = [
            (self.added, "added"),
            (self.modified, "modified"),
            (self.deleted, "deleted"),
            (self.renamed, "renamed"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Files of one target. Counts are always derived from `files`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetChanges {
    pub key: String,
    pub title: String,
    files: Vec<GenerateFileChange>,
}

impl TargetChanges {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, change: GenerateFileChange) {
        self.files.push(change);
    }

    pub fn files(&self) -> &[GenerateFileChange] {
        &self.files
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts::from_files(&self.files)
    }

    fn sort(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

impl Serialize for TargetChanges {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TargetChanges", 4)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("counts", &self.counts())?;
        state.serialize_field("files", &self.files)?;
        state.end()
    }
}

/// Result of one change collection.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateChangeSet {
    pub source: ChangeSource,
    pub targets: HashMap<String, TargetChanges>,
    /// Keys of `targets` in target declaration order.
    pub target_keys: Vec<String>,
    pub warning: Option<String>,
    pub snapshot_root: Option<PathBuf>,
    pub snapshot_taken_at: Option<DateTime<Utc>>,
}

impl GenerateChangeSet {
    pub fn empty(source: ChangeSource) -> Self {
        Self {
            source,
            targets: HashMap::new(),
            target_keys: Vec::new(),
            warning: None,
            snapshot_root: None,
            snapshot_taken_at: None,
        }
    }

    /// Buckets `changes` by target, sorting each bucket by path. Changes are
    /// matched against `targets` by their `target_key`, falling back to path
    /// ownership; changes belonging to no target are dropped.
    pub fn from_changes(
        source: ChangeSource,
        changes: impl IntoIterator<Item = GenerateFileChange>,
        targets: &[GenerateTargetDefinition],
    ) -> Self {
        let mut set = Self::empty(source);
        for change in changes {
            let target = targets
                .iter()
                .find(|t| t.key == change.target_key)
                .or_else(|| target_for_path(targets, &change.path));
            let Some(target) = target else {
                continue;
            };
            set.targets
                .entry(target.key.to_string())
                .or_insert_with(|| TargetChanges::new(target.key, target.title))
                .push(change);
        }
        for bucket in set.targets.values_mut() {
            bucket.sort();
        }
        set.target_keys = targets
            .iter()
            .filter(|t| set.targets.contains_key(t.key))
            .map(|t| t.key.to_string())
            .collect();
        set
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn target(&self, key: &str) -> Option<&TargetChanges> {
        self.targets.get(key)
    }

    /// Targets in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetChanges> {
        self.target_keys
            .iter()
            .filter_map(|key| self.targets.get(key))
    }

    /// Every file in display order.
    pub fn files(&self) -> impl Iterator<Item = &GenerateFileChange> {
        self.iter().flat_map(|target| target.files().iter())
    }

    pub fn find_file(&self, path: &str) -> Option<&GenerateFileChange> {
        self.files().find(|file| file.path == path)
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts::from_files(self.files())
    }

    pub fn is_empty(&self) -> bool {
        self.targets.values().all(|target| target.files().is_empty())
    }
}
