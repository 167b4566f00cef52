use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use portable_pty::PtySize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::cancel::CancelHandle;
use super::runner::{self, RunContext};
use super::types::{JobCallback, JobEvent, JobId, JobPhase, JobRequest, JobStatus};

pub const DEFAULT_PTY_ROWS: u16 = 24;
pub const DEFAULT_PTY_COLS: u16 = 200;

/// Run-time record of one job, alive from enqueue until its terminal event
/// has been handled.
struct JobState {
    id: JobId,
    request: JobRequest,
    cancel: Arc<CancelHandle>,
}

/// Queue and scheduler for external commands.
///
/// At most `max_parallel` jobs run at once and queued jobs start in
/// submission order. The manager is driven from one task: events produced by
/// workers arrive on the receiver returned by [`JobManager::new`] and must be
/// passed back through [`JobManager::handle_event`], which is where finished
/// jobs free their slot.
pub struct JobManager {
    max_parallel: usize,
    next_id: u64,
    size: PtySize,
    events: UnboundedSender<JobEvent>,
    queue: VecDeque<JobState>,
    running: HashMap<JobId, JobState>,
    /// Queued jobs cancelled before starting, until their event is handled.
    withdrawn: HashMap<JobId, JobState>,
    statuses: BTreeMap<JobId, JobStatus>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("max_parallel", &self.max_parallel)
            .field("running", &self.running.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl JobManager {
    /// Creates a manager and the event stream its jobs report on.
    pub fn new(max_parallel: usize) -> (Self, UnboundedReceiver<JobEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let manager = Self {
            max_parallel: max_parallel.max(1),
            next_id: 0,
            size: PtySize {
                rows: DEFAULT_PTY_ROWS,
                cols: DEFAULT_PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            },
            events,
            queue: VecDeque::new(),
            running: HashMap::new(),
            withdrawn: HashMap::new(),
            statuses: BTreeMap::new(),
        };
        (manager, rx)
    }

    /// Sets the pseudo-terminal size used for jobs started from now on.
    pub fn with_pty_size(mut self, rows: u16, cols: u16) -> Self {
        self.size.rows = rows.max(1);
        self.size.cols = cols.max(1);
        self
    }

    /// Queues a request and starts it right away if a slot is free.
    pub fn enqueue(&mut self, request: JobRequest) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        log::debug!("job {id} queued: {}", request.command_line());
        self.statuses
            .insert(id, JobStatus::queued(id, request.title.clone()));
        self.queue.push_back(JobState {
            id,
            request,
            cancel: Arc::new(CancelHandle::default()),
        });
        self.pump();
        id
    }

    /// Requests cancellation. A queued job is withdrawn and never started; a
    /// running job gets one interrupt however often this is called. Returns
    /// false when the id is unknown or the job already finished.
    pub fn cancel(&mut self, id: JobId) -> bool {
        if let Some(pos) = self.queue.iter().position(|job| job.id == id) {
            let Some(job) = self.queue.remove(pos) else {
                return false;
            };
            if let Some(status) = self.statuses.get_mut(&id) {
                status.cancel_requested = true;
            }
            job.cancel.request();
            let _ = self.events.send(JobEvent::Cancelled {
                id,
                title: job.request.title.clone(),
            });
            log::info!("job {id} ({}) cancelled before start", job.request.title);
            self.withdrawn.insert(id, job);
            return true;
        }

        let Some(job) = self.running.get(&id) else {
            return false;
        };
        if job.cancel.request() {
            log::info!("job {id} ({}) cancellation requested", job.request.title);
        }
        if let Some(status) = self.statuses.get_mut(&id) {
            status.cancel_requested = true;
            if status.phase == JobPhase::Running {
                status.phase = JobPhase::Cancelling;
            }
        }
        true
    }

    /// Cancels every queued and running job.
    pub fn cancel_all(&mut self) -> usize {
        let ids: Vec<JobId> = self
            .queue
            .iter()
            .map(|job| job.id)
            .chain(self.running.keys().copied())
            .collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Changes the parallelism limit, clamped to at least one. Raising it
    /// starts queued jobs immediately; lowering it never stops running jobs.
    pub fn set_max_parallel(&mut self, max_parallel: usize) {
        self.max_parallel = max_parallel.max(1);
        self.pump();
    }

    /// Applies a worker event to the job table. Terminal events free the
    /// job's slot and start the next queued job. Returns the job's updated
    /// status.
    pub fn handle_event(&mut self, event: &JobEvent) -> Option<JobStatus> {
        let id = event.id();
        match event {
            JobEvent::Started { .. } => {
                let callback = self
                    .running
                    .get(&id)
                    .and_then(|job| job.request.on_start.clone());
                self.notify(id, callback);
            }
            JobEvent::Log { .. } => {}
            JobEvent::Finished { error, .. } => {
                let job = self.running.remove(&id)?;
                let cancel_requested = job.cancel.is_requested();
                let phase = JobPhase::from_exit(error.as_ref(), cancel_requested);
                if let Some(status) = self.statuses.get_mut(&id) {
                    status.phase = phase;
                    status.finished_at = Some(Utc::now());
                    status.cancel_requested = cancel_requested;
                    status.last_error = error.as_ref().map(ToString::to_string);
                }
                match (phase, error) {
                    (JobPhase::Failed, Some(err)) if err.looks_interrupted() => log::warn!(
                        "job {id} ({}) was interrupted without a cancel request: {err}",
                        job.request.title
                    ),
                    (JobPhase::Failed, Some(err)) => {
                        log::warn!("job {id} ({}) failed: {err}", job.request.title)
                    }
                    _ => log::info!("job {id} ({}) {phase}", job.request.title),
                }
                self.notify(id, job.request.on_finish.clone());
                self.pump();
            }
            JobEvent::Cancelled { .. } => {
                let job = self.withdrawn.remove(&id)?;
                if let Some(status) = self.statuses.get_mut(&id) {
                    status.phase = JobPhase::Cancelled;
                    status.finished_at = Some(Utc::now());
                }
                self.notify(id, job.request.on_finish.clone());
            }
        }
        self.statuses.get(&id).cloned()
    }

    pub fn status(&self, id: JobId) -> Option<&JobStatus> {
        self.statuses.get(&id)
    }

    /// Every job seen so far, oldest first.
    pub fn statuses(&self) -> impl Iterator<Item = &JobStatus> {
        self.statuses.values()
    }

    /// Forgets statuses of jobs that reached a terminal phase.
    pub fn clear_finished(&mut self) {
        self.statuses.retain(|_, status| !status.phase.is_terminal());
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// True once nothing is queued, running, or awaiting its final event.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running.is_empty() && self.withdrawn.is_empty()
    }

    fn pump(&mut self) {
        while self.running.len() < self.max_parallel {
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            self.start(job);
        }
    }

    fn start(&mut self, job: JobState) {
        let id = job.id;
        if let Some(status) = self.statuses.get_mut(&id) {
            status.phase = JobPhase::Running;
            status.started_at = Some(Utc::now());
        }
        runner::spawn(RunContext {
            id,
            request: job.request.clone(),
            events: self.events.clone(),
            cancel: Arc::clone(&job.cancel),
            size: self.size,
        });
        self.running.insert(id, job);
    }

    fn notify(&self, id: JobId, callback: Option<JobCallback>) {
        if let (Some(callback), Some(status)) = (callback, self.statuses.get(&id)) {
            callback(status);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::jobs::JobError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(20);

    fn sh(title: &str, script: &str) -> JobRequest {
        JobRequest::new(title, "sh").args(["-c", script])
    }

    async fn next_event(
        manager: &mut JobManager,
        rx: &mut UnboundedReceiver<JobEvent>,
    ) -> JobEvent {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a job event")
            .expect("event channel closed");
        manager.handle_event(&event);
        event
    }

    /// Feeds events back until every job is done, checking the limit.
    async fn drain(
        manager: &mut JobManager,
        rx: &mut UnboundedReceiver<JobEvent>,
    ) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while !manager.is_idle() {
            let event = next_event(manager, rx).await;
            assert!(manager.running_count() <= manager.max_parallel());
            events.push(event);
        }
        events
    }

    fn position(events: &[JobEvent], pred: impl Fn(&JobEvent) -> bool) -> usize {
        events.iter().position(pred).expect("event not found")
    }

    fn started(id: JobId) -> impl Fn(&JobEvent) -> bool {
        move |e| matches!(e, JobEvent::Started { id: got, .. } if *got == id)
    }

    fn finished(id: JobId) -> impl Fn(&JobEvent) -> bool {
        move |e| matches!(e, JobEvent::Finished { id: got, .. } if *got == id)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn streams_output_and_succeeds() {
        let (mut manager, mut rx) = JobManager::new(2);
        let id = manager.enqueue(sh("echo", "echo hello; echo world"));
        let events = drain(&mut manager, &mut rx).await;

        assert!(started(id)(&events[0]));
        let lines: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Log { line, .. } if !line.is_empty() => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["hello", "world"]);
        assert_eq!(
            events.last(),
            Some(&JobEvent::Finished {
                id,
                title: "echo".into(),
                error: None
            })
        );

        let status = manager.status(id).unwrap();
        assert_eq!(status.phase, JobPhase::Succeeded);
        assert!(status.started_at.is_some() && status.finished_at.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn single_slot_runs_in_submission_order() {
        let (mut manager, mut rx) = JobManager::new(1);
        let ids: Vec<JobId> = (0..3)
            .map(|n| manager.enqueue(sh(&format!("job{n}"), "sleep 0.1")))
            .collect();
        assert_eq!(manager.running_count(), 1);
        assert_eq!(manager.queued_count(), 2);

        let events = drain(&mut manager, &mut rx).await;
        for pair in ids.windows(2) {
            assert!(position(&events, finished(pair[0])) < position(&events, started(pair[1])));
        }
        for id in ids {
            assert_eq!(manager.status(id).unwrap().phase, JobPhase::Succeeded);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_queued_job_never_starts() {
        let (mut manager, mut rx) = JobManager::new(1);
        let blocker = manager.enqueue(JobRequest::new("blocker", "sleep").arg("5"));
        let waiting = manager.enqueue(sh("waiting", "echo should-not-run"));

        assert!(manager.cancel(waiting));
        assert_eq!(manager.queued_count(), 0);
        assert!(manager.cancel(blocker));

        let events = drain(&mut manager, &mut rx).await;
        assert!(!events.iter().any(started(waiting)));
        assert!(events
            .iter()
            .any(|e| matches!(e, JobEvent::Cancelled { id, .. } if *id == waiting)));

        let status = manager.status(waiting).unwrap();
        assert_eq!(status.phase, JobPhase::Cancelled);
        assert!(status.cancel_requested);
        assert!(status.started_at.is_none());
        assert_eq!(manager.status(blocker).unwrap().phase, JobPhase::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelling_running_job_interrupts_it_once() {
        let (mut manager, mut rx) = JobManager::new(1);
        let id = manager.enqueue(JobRequest::new("sleeper", "sleep").arg("5"));
        let first = next_event(&mut manager, &mut rx).await;
        assert!(started(id)(&first));

        assert!(manager.cancel(id));
        assert!(manager.cancel(id));
        assert_eq!(manager.status(id).unwrap().phase, JobPhase::Cancelling);

        let events = drain(&mut manager, &mut rx).await;
        match events.last() {
            Some(JobEvent::Finished { error, .. }) => assert!(error.is_some()),
            other => panic!("unexpected final event {other:?}"),
        }
        let status = manager.status(id).unwrap();
        assert_eq!(status.phase, JobPhase::Cancelled);
        assert!(status.cancel_requested);
        assert!(!manager.cancel(id));
        assert!(!manager.cancel(JobId(999)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nonzero_exit_fails_without_cancel() {
        let (mut manager, mut rx) = JobManager::new(1);
        let id = manager.enqueue(sh("exit", "exit 3"));
        let events = drain(&mut manager, &mut rx).await;
        assert!(matches!(
            events.last(),
            Some(JobEvent::Finished { error: Some(JobError::Exit { code: 3, signal: None }), .. })
        ));
        let status = manager.status(id).unwrap();
        assert_eq!(status.phase, JobPhase::Failed);
        assert_eq!(status.last_error.as_deref(), Some("exit status 3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_program_reports_spawn_error() {
        let (mut manager, mut rx) = JobManager::new(1);
        let id = manager.enqueue(JobRequest::new("ghost", "creator-panel-no-such-program"));
        let events = drain(&mut manager, &mut rx).await;

        assert_eq!(events.len(), 3, "{events:?}");
        assert!(started(id)(&events[0]));
        assert!(matches!(&events[1], JobEvent::Log { line, .. } if line.contains("creator-panel-no-such-program")));
        assert!(matches!(
            &events[2],
            JobEvent::Finished { error: Some(JobError::Spawn { .. }), .. }
        ));
        assert_eq!(manager.status(id).unwrap().phase, JobPhase::Failed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn passes_environment_and_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, mut rx) = JobManager::new(1);
        manager.enqueue(
            sh("env", "echo \"$CREATOR_PANEL_TEST:$(pwd)\"")
                .env("CREATOR_PANEL_TEST", "marker")
                .dir(dir.path()),
        );
        let events = drain(&mut manager, &mut rx).await;
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(events.iter().any(|e| matches!(
            e,
            JobEvent::Log { line, .. } if line.starts_with("marker:") && line.ends_with(&name)
        )));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lowering_limit_keeps_running_jobs() {
        let (mut manager, mut rx) = JobManager::new(2);
        let a = manager.enqueue(sh("a", "sleep 0.3"));
        let b = manager.enqueue(sh("b", "sleep 0.3"));
        let c = manager.enqueue(sh("c", "sleep 0.1"));
        assert_eq!(manager.running_count(), 2);

        manager.set_max_parallel(1);
        assert_eq!(manager.running_count(), 2);

        let mut events = Vec::new();
        while !manager.is_idle() {
            events.push(next_event(&mut manager, &mut rx).await);
        }
        let c_start = position(&events, started(c));
        assert!(position(&events, finished(a)) < c_start);
        assert!(position(&events, finished(b)) < c_start);
        assert_eq!(manager.status(a).unwrap().phase, JobPhase::Succeeded);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn raising_limit_starts_queued_jobs() {
        let (mut manager, mut rx) = JobManager::new(1);
        manager.enqueue(JobRequest::new("one", "sleep").arg("5"));
        manager.enqueue(JobRequest::new("two", "sleep").arg("5"));
        assert_eq!(manager.queued_count(), 1);

        manager.set_max_parallel(0);
        assert_eq!(manager.max_parallel(), 1);

        manager.set_max_parallel(2);
        assert_eq!(manager.running_count(), 2);
        assert_eq!(manager.queued_count(), 0);

        assert_eq!(manager.cancel_all(), 2);
        drain(&mut manager, &mut rx).await;
        assert!(manager
            .statuses()
            .all(|status| status.phase == JobPhase::Cancelled));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn callbacks_fire_on_controller_side() {
        let starts = Arc::new(AtomicUsize::new(0));
        let finishes = Arc::new(AtomicUsize::new(0));
        let (mut manager, mut rx) = JobManager::new(1);
        let request = {
            let starts = Arc::clone(&starts);
            let finishes = Arc::clone(&finishes);
            sh("cb", "true")
                .on_start(move |status| {
                    assert_eq!(status.phase, JobPhase::Running);
                    starts.fetch_add(1, Ordering::SeqCst);
                })
                .on_finish(move |status| {
                    assert_eq!(status.phase, JobPhase::Succeeded);
                    finishes.fetch_add(1, Ordering::SeqCst);
                })
        };
        manager.enqueue(request);
        drain(&mut manager, &mut rx).await;

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
        manager.clear_finished();
        assert_eq!(manager.statuses().count(), 0);
    }
}
