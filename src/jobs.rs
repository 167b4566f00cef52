//! Bounded-parallelism execution of external commands.
//!
//! [`JobManager`] is owned by a single controller (the panel's event loop).
//! Every job runs on its own blocking worker with a pseudo-terminal attached
//! and reports back only through [`JobEvent`]s, which the controller feeds to
//! [`JobManager::handle_event`].

mod cancel;
mod manager;
mod runner;
mod types;

pub use cancel::{CancelHandle, Interrupt};
pub use manager::{JobManager, DEFAULT_PTY_COLS, DEFAULT_PTY_ROWS};
pub use types::{JobCallback, JobError, JobEvent, JobId, JobPhase, JobRequest, JobStatus};
