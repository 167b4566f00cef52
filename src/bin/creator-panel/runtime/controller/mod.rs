mod changes;
mod input;
mod jobs;

use std::future::Future;

use tokio::sync::mpsc;

use creator_panel::jobs::JobManager;

use crate::app::Session;
use crate::runtime::{AppEvent, AppState};

pub struct AppController {
    pub state: AppState,
    session: Session,
    manager: JobManager,
    event_sender: mpsc::Sender<AppEvent>,
    changes_request: u64,
    snapshot_pending: bool,
}

impl AppController {
    pub fn new(session: Session, manager: JobManager, event_sender: mpsc::Sender<AppEvent>) -> Self {
        let state = AppState::new(session.project.clone(), &session.config);
        let mut controller = Self {
            state,
            session,
            manager,
            event_sender,
            changes_request: 0,
            snapshot_pending: false,
        };
        controller.sync_jobs();
        controller
    }

    /// Applies one event; returns whether the screen needs a redraw.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Input(input) => input::handle_input(self, input),
            AppEvent::Tick => self.manager.running_count() > 0,
            AppEvent::Job(event) => jobs::handle_job_event(self, event),
            AppEvent::Snapshot { keys, result } => jobs::handle_snapshot(self, keys, result),
            AppEvent::Changes { request, result } => changes::handle_changes(self, request, result),
            AppEvent::Diff {
                path,
                side_by_side,
                result,
            } => changes::handle_diff(self, path, side_by_side, result),
        }
    }

    pub fn refresh_changes(&mut self) {
        changes::refresh(self);
    }

    /// Copies job statuses and counters into the render state.
    fn sync_jobs(&mut self) {
        self.state.jobs = self.manager.statuses().cloned().collect();
        self.state.max_parallel = self.manager.max_parallel();
        self.state.running = self.manager.running_count();
        self.state.queued = self.manager.queued_count();
        if self.state.selected_job >= self.state.jobs.len() {
            self.state.selected_job = self.state.jobs.len().saturating_sub(1);
        }
    }

    /// Runs `work` on the runtime and feeds its result back as an event.
    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let _ = sender.send(work.await).await;
        });
    }
}
