use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Monotonically increasing job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked on the controller thread with the job's current status.
pub type JobCallback = Arc<dyn Fn(&JobStatus) + Send + Sync>;

/// Immutable description of one command to run.
#[derive(Clone)]
pub struct JobRequest {
    pub title: String,
    pub dir: Option<PathBuf>,
    pub program: String,
    pub args: Vec<String>,
    /// Appended to the inherited environment.
    pub env: Vec<(String, String)>,
    pub on_start: Option<JobCallback>,
    pub on_finish: Option<JobCallback>,
}

impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRequest")
            .field("title", &self.title)
            .field("dir", &self.dir)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &self.env)
            .field("on_start", &self.on_start.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

impl JobRequest {
    pub fn new(title: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            dir: None,
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            on_start: None,
            on_finish: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn on_start(mut self, callback: impl Fn(&JobStatus) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(callback));
        self
    }

    pub fn on_finish(mut self, callback: impl Fn(&JobStatus) + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Arc::new(callback));
        self
    }

    /// The command line as typed into a shell, for display.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Caller-facing lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Queued,
    Running,
    Cancelling,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Outcome of a finished process. The cancel flag decides whether an
    /// error counts as a cancellation; the error text never does.
    pub fn from_exit(error: Option<&JobError>, cancel_requested: bool) -> Self {
        match (error, cancel_requested) {
            (None, _) => Self::Succeeded,
            (Some(_), true) => Self::Cancelled,
            (Some(_), false) => Self::Failed,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: JobId,
    pub title: String,
    pub phase: JobPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub cancel_requested: bool,
}

impl JobStatus {
    pub(crate) fn queued(id: JobId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            phase: JobPhase::Queued,
            started_at: None,
            finished_at: None,
            last_error: None,
            cancel_requested: false,
        }
    }

    /// Run time so far, or total run time once finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some(end - started)
    }
}

/// Messages a running job sends to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Started {
        id: JobId,
        title: String,
    },
    Log {
        id: JobId,
        title: String,
        line: String,
    },
    Finished {
        id: JobId,
        title: String,
        error: Option<JobError>,
    },
    /// A queued job was cancelled before it ever started.
    Cancelled {
        id: JobId,
        title: String,
    },
}

impl JobEvent {
    pub fn id(&self) -> JobId {
        match self {
            Self::Started { id, .. }
            | Self::Log { id, .. }
            | Self::Finished { id, .. }
            | Self::Cancelled { id, .. } => *id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Started { title, .. }
            | Self::Log { title, .. }
            | Self::Finished { title, .. }
            | Self::Cancelled { title, .. } => title,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Cancelled { .. })
    }
}

/// Why a job did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("failed to open pseudo-terminal: {0}")]
    Pty(String),
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("failed waiting for process: {0}")]
    Wait(String),
    /// Non-zero exit. `signal` names the signal that ended the process.
    #[error("{}", exit_text(.code, .signal))]
    Exit { code: u32, signal: Option<String> },
}

fn exit_text(code: &u32, signal: &Option<String>) -> String {
    match signal {
        Some(signal) => format!("killed by signal ({signal})"),
        None => format!("exit status {code}"),
    }
}

/// Exit code shells report for a process ended by SIGINT.
const SIGINT_EXIT_CODE: u32 = 130;

impl JobError {
    /// Best-effort guess that the process died from an interrupt. Only used
    /// to word log messages; cancellation is decided by the cancel flag.
    pub fn looks_interrupted(&self) -> bool {
        match self {
            Self::Exit { code, signal } => {
                *code == SIGINT_EXIT_CODE
                    || signal
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains("interrupt"))
            }
            other => {
                let text = other.to_string().to_lowercase();
                text.contains("interrupt") || text.contains("signal")
            }
        }
    }
}
