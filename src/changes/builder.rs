use std::path::Path;

use crate::error::ChangeError;

use super::git::collect_git_changes;
use super::snapshot::SnapshotStore;
use super::targets::GenerateTargetDefinition;
use super::types::{ChangeSource, GenerateChangeSet};

pub const NO_GIT_WARNING: &str =
    "Git repository not detected; changes are based on the generation snapshot.";

/// Collects the changes of `targets` in `project`, preferring git and falling
/// back to the snapshot store when git is unusable.
pub fn collect_generate_changes(
    project: &Path,
    targets: &[GenerateTargetDefinition],
    store: &SnapshotStore,
) -> Result<GenerateChangeSet, ChangeError> {
    if let Some(changes) = collect_git_changes(project, targets)? {
        return Ok(GenerateChangeSet::from_changes(
            ChangeSource::Git,
            changes,
            targets,
        ));
    }
    let set = store.collect_changes(project, targets)?;
    if set.warning.is_some() {
        return Ok(set);
    }
    Ok(set.with_warning(NO_GIT_WARNING))
}
