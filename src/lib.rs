//! Core engines behind the creator panel.
//!
//! The crate is split into three subsystems that the panel combines into its
//! main workflow (capture a baseline, run a generation command, show what
//! changed):
//!
//! - [`jobs`]: runs external commands on a pseudo-terminal under a
//!   parallelism limit and streams their output as [`jobs::JobEvent`]s.
//! - [`changes`]: classifies which files of a generation target changed,
//!   through git when available and through content-hash snapshots otherwise.
//! - [`diff`]: a longest-common-subsequence line diff with unified and
//!   side-by-side renderers.

pub mod changes;
pub mod diff;
pub mod error;
pub mod jobs;

pub use changes::{
    collect_generate_changes, ChangeCounts, ChangeKind, ChangeSource, GenerateChangeSet,
    GenerateFileChange, GenerateTargetDefinition, SnapshotRecord, SnapshotStore,
};
pub use diff::{diff, DiffChunk, DiffOp};
pub use error::{ChangeError, CreatorError};
pub use jobs::{JobError, JobEvent, JobId, JobManager, JobPhase, JobRequest, JobStatus};
