use creator_panel::changes::find_target;
use creator_panel::jobs::JobEvent;
use creator_panel::SnapshotRecord;

use crate::runtime::{AppEvent, Focus, NoticeLevel};

use super::{changes, AppController};

/// Captures a baseline for `keys`; the jobs are queued once it is taken.
/// While other generations run their baselines are kept and extended.
pub(super) fn start_generation(controller: &mut AppController, keys: Vec<&'static str>) -> bool {
    if keys.is_empty() {
        return false;
    }
    if controller.snapshot_pending {
        controller
            .state
            .notify(NoticeLevel::Warn, "a snapshot is still being captured");
        return true;
    }
    controller.snapshot_pending = true;
    let extend = snapshot_mode(controller) == SnapshotMode::Extend;
    controller.state.notify(
        NoticeLevel::Info,
        format!("capturing snapshot of {}", keys.join(", ")),
    );
    let session = controller.session.clone();
    controller.spawn(async move {
        let result = if extend {
            session.extend_snapshot(keys.clone()).await
        } else {
            session.prepare_snapshot(keys.clone()).await
        };
        AppEvent::Snapshot {
            keys,
            result: result.map_err(|err| format!("{err:#}")),
        }
    });
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotMode {
    Fresh,
    Extend,
}

fn snapshot_mode(controller: &AppController) -> SnapshotMode {
    if controller.manager.is_idle() {
        SnapshotMode::Fresh
    } else {
        SnapshotMode::Extend
    }
}

pub(super) fn handle_snapshot(
    controller: &mut AppController,
    keys: Vec<&'static str>,
    result: Result<SnapshotRecord, String>,
) -> bool {
    controller.snapshot_pending = false;
    match result {
        Ok(record) => {
            log::info!("generation baseline at {}", record.root.display());
            controller.state.notify(
                NoticeLevel::Info,
                format!("snapshot captured, generating {}", keys.join(", ")),
            );
        }
        Err(err) => {
            log::warn!("snapshot of [{}] failed: {err}", keys.join(", "));
            controller.state.notify(
                NoticeLevel::Warn,
                format!("snapshot failed, running without a baseline: {err}"),
            );
        }
    }

    let first_new = controller.state.jobs.len();
    for key in &keys {
        let request = find_target(key)
            .ok_or_else(|| anyhow::anyhow!("unknown target '{key}'"))
            .and_then(|def| controller.session.generate_request(def));
        match request {
            Ok(request) => {
                controller.manager.enqueue(request);
            }
            Err(err) => controller
                .state
                .notify(NoticeLevel::Error, format!("{key}: {err:#}")),
        }
    }
    controller.sync_jobs();
    if controller.state.jobs.len() > first_new {
        controller.state.selected_job = first_new;
        controller.state.log_scroll = 0;
        controller.state.focus = Focus::Jobs;
    }
    true
}

pub(super) fn handle_job_event(controller: &mut AppController, event: JobEvent) -> bool {
    controller.manager.handle_event(&event);
    let terminal = event.is_terminal();
    match event {
        JobEvent::Started { .. } => {}
        JobEvent::Log { id, line, .. } => controller.state.push_log(id, line),
        JobEvent::Finished { id, title, error } => {
            let phase = controller.manager.status(id).map(|status| status.phase);
            let summary = match (&error, phase) {
                (None, _) => format!("{title} finished"),
                (Some(err), Some(phase)) => format!("{title} {phase}: {err}"),
                (Some(err), None) => format!("{title} ended: {err}"),
            };
            controller.state.push_log(id, format!("-- {summary}"));
            let level = if error.is_some() {
                NoticeLevel::Warn
            } else {
                NoticeLevel::Info
            };
            controller.state.notify(level, summary);
        }
        JobEvent::Cancelled { id, title } => {
            controller
                .state
                .push_log(id, "-- cancelled before start".to_string());
            controller
                .state
                .notify(NoticeLevel::Info, format!("{title} cancelled"));
        }
    }
    controller.sync_jobs();
    if terminal && controller.manager.is_idle() {
        if controller.state.quit_requested {
            controller.state.should_quit = true;
        } else {
            changes::refresh(controller);
        }
    }
    true
}

pub(super) fn cancel_selected(controller: &mut AppController) -> bool {
    let Some(job) = controller.state.selected_job() else {
        return false;
    };
    let (id, title) = (job.id, job.title.clone());
    if controller.manager.cancel(id) {
        controller
            .state
            .notify(NoticeLevel::Info, format!("cancelling {title}"));
    } else {
        controller
            .state
            .notify(NoticeLevel::Info, format!("{title} is not running"));
    }
    controller.sync_jobs();
    true
}

pub(super) fn adjust_parallel(controller: &mut AppController, delta: isize) -> bool {
    let next = controller
        .manager
        .max_parallel()
        .saturating_add_signed(delta)
        .max(1);
    controller.manager.set_max_parallel(next);
    controller.sync_jobs();
    controller.state.notify(
        NoticeLevel::Info,
        format!("parallel jobs: {}", controller.manager.max_parallel()),
    );
    true
}

/// Quits right away when idle. Otherwise the first request cancels every
/// job and the panel closes once they have stopped or on a second request.
pub(super) fn request_quit(controller: &mut AppController) -> bool {
    if controller.manager.is_idle() || controller.state.quit_requested {
        controller.state.should_quit = true;
        return true;
    }
    let cancelled = controller.manager.cancel_all();
    controller.state.quit_requested = true;
    controller.state.notify(
        NoticeLevel::Warn,
        format!("cancelling {cancelled} job(s); press q again to quit now"),
    );
    controller.sync_jobs();
    true
}
