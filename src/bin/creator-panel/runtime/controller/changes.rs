use creator_panel::changes::RenderedDiff;
use creator_panel::GenerateChangeSet;

use crate::runtime::{AppEvent, DiffBody, DiffOverlay, NoticeLevel};

use super::AppController;

pub(super) fn refresh(controller: &mut AppController) {
    controller.changes_request += 1;
    controller.state.changes_loading = true;
    let request = controller.changes_request;
    let session = controller.session.clone();
    controller.spawn(async move {
        let result = session
            .collect_changes()
            .await
            .map_err(|err| format!("{err:#}"));
        AppEvent::Changes { request, result }
    });
}

pub(super) fn handle_changes(
    controller: &mut AppController,
    request: u64,
    result: Result<GenerateChangeSet, String>,
) -> bool {
    if request != controller.changes_request {
        return false;
    }
    let state = &mut controller.state;
    state.changes_loading = false;
    match result {
        Ok(set) => {
            log::debug!("change set refreshed: {}", set.counts().summary());
            state.changes = Some(set);
            let count = state.change_count();
            if state.selected_change >= count {
                state.selected_change = count.saturating_sub(1);
            }
        }
        Err(err) => {
            log::warn!("collecting changes failed: {err}");
            state.notify(NoticeLevel::Error, format!("changes: {err}"));
        }
    }
    true
}

pub(super) fn open_diff(controller: &mut AppController) -> bool {
    let Some(change) = controller.state.selected_change().cloned() else {
        controller
            .state
            .notify(NoticeLevel::Info, "no changed file selected");
        return true;
    };
    controller.state.overlay = Some(DiffOverlay {
        path: change.path.clone(),
        side_by_side: controller.state.side_by_side,
        column_width: controller.session.config.diff.column_width,
        body: DiffBody::Loading,
        stats: None,
        scroll: 0,
    });
    load_diff(controller, change);
    true
}

pub(super) fn toggle_side_by_side(controller: &mut AppController) -> bool {
    controller.state.side_by_side = !controller.state.side_by_side;
    let side_by_side = controller.state.side_by_side;
    let Some(overlay) = controller.state.overlay.as_mut() else {
        return true;
    };
    overlay.side_by_side = side_by_side;
    overlay.body = DiffBody::Loading;
    overlay.scroll = 0;
    let path = overlay.path.clone();
    let change = controller
        .state
        .changes
        .as_ref()
        .and_then(|set| set.find_file(&path))
        .cloned();
    match change {
        Some(change) => load_diff(controller, change),
        None => {
            if let Some(overlay) = controller.state.overlay.as_mut() {
                overlay.body = DiffBody::Failed(format!("{path} is no longer changed"));
            }
        }
    }
    true
}

fn load_diff(controller: &AppController, change: creator_panel::GenerateFileChange) {
    let session = controller.session.clone();
    let side_by_side = controller.state.side_by_side;
    controller.spawn(async move {
        let path = change.path.clone();
        let result = session
            .render_diff(change, side_by_side)
            .await
            .map_err(|err| format!("{err:#}"));
        AppEvent::Diff {
            path,
            side_by_side,
            result,
        }
    });
}

pub(super) fn handle_diff(
    controller: &mut AppController,
    path: String,
    side_by_side: bool,
    result: Result<RenderedDiff, String>,
) -> bool {
    let Some(overlay) = controller.state.overlay.as_mut() else {
        return false;
    };
    if overlay.path != path || overlay.side_by_side != side_by_side {
        return false;
    }
    overlay.body = match result {
        Ok(rendered) => {
            overlay.stats = Some(rendered.stats);
            if rendered.text.trim().is_empty() {
                DiffBody::Ready("(no textual differences)".into())
            } else {
                DiffBody::Ready(rendered.text)
            }
        }
        Err(err) => DiffBody::Failed(err),
    };
    true
}
