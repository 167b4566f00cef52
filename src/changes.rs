//! Tracking of what a generation command changed.
//!
//! Changes are collected from git when the project is a working tree and
//! from a content-hash snapshot otherwise. Both collectors scope their
//! results to the generation targets in [`targets`].

mod builder;
mod file_diff;
mod git;
mod snapshot;
pub mod targets;
mod types;

pub use builder::{collect_generate_changes, NO_GIT_WARNING};
pub use file_diff::{render_file_diff, DiffRenderOptions, RenderedDiff};
pub use git::{collect_git_changes, git_usable, parse_porcelain, unquote_path};
pub use snapshot::{SnapshotRecord, SnapshotStore, NO_SNAPSHOT_WARNING, SNAPSHOT_DIR};
pub use targets::{all_targets, find_target, target_for_path, GenerateTargetDefinition};
pub use types::{
    ChangeCounts, ChangeKind, ChangeSource, GenerateChangeSet, GenerateFileChange, TargetChanges,
};
