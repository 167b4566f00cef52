use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use creator_panel::jobs::{JobPhase, JobStatus};
use creator_panel::{ChangeKind, ChangeSource};

use crate::runtime::{AppState, Focus};

use super::theme::{indicators, Theme};

fn panel_block<'a>(title: String, focused: bool, theme: &Theme) -> Block<'a> {
    let border = if focused {
        theme.border_focused
    } else {
        theme.border
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(title, if focused { theme.accent } else { theme.muted }))
}

fn render_list(
    frame: &mut Frame<'_>,
    area: Rect,
    block: Block<'_>,
    items: Vec<ListItem<'static>>,
    selected: Option<usize>,
    theme: &Theme,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(theme.selected)
        .highlight_symbol(indicators::SELECTED);
    let mut list_state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn render_targets(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let focused = state.focus == Focus::Targets;
    let items = state
        .targets
        .iter()
        .map(|def| {
            let busy = state
                .jobs
                .iter()
                .any(|job| job.title == def.title && !job.phase.is_terminal());
            let marker = if busy { indicators::RUNNING } else { " " };
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {} ", def.title)),
                Span::styled(marker, theme.status_ok),
            ]))
        })
        .collect();
    render_list(
        frame,
        area,
        panel_block("Targets".to_string(), focused, theme),
        items,
        focused.then_some(state.selected_target),
        theme,
    );
}

fn phase_style(phase: JobPhase, theme: &Theme) -> (&'static str, Style) {
    match phase {
        JobPhase::Queued => (indicators::QUEUED, theme.muted),
        JobPhase::Running => (indicators::RUNNING, theme.accent),
        JobPhase::Cancelling => (indicators::RUNNING, theme.status_warn),
        JobPhase::Succeeded => (indicators::CHECK, theme.status_ok),
        JobPhase::Failed => (indicators::CROSS, theme.status_error),
        JobPhase::Cancelled => (indicators::STOPPED, theme.status_warn),
    }
}

pub fn format_elapsed(job: &JobStatus) -> String {
    let Some(elapsed) = job.elapsed() else {
        return String::new();
    };
    let secs = elapsed.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn render_jobs(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let focused = state.focus == Focus::Jobs;
    let items = state
        .jobs
        .iter()
        .map(|job| {
            let (symbol, style) = phase_style(job.phase, theme);
            let mut spans = vec![
                Span::styled(format!(" {symbol} "), style),
                Span::raw(format!("{:<5} {:<10} ", job.id.to_string(), job.title)),
                Span::styled(format!("{:<10} ", job.phase.as_str()), style),
                Span::styled(format_elapsed(job), theme.muted),
            ];
            if let Some(error) = &job.last_error {
                spans.push(Span::styled(format!("  {error}"), theme.muted));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let title = format!(
        "Jobs ({} running, {} queued)",
        state.running, state.queued
    );
    render_list(
        frame,
        area,
        panel_block(title, focused, theme),
        items,
        focused.then_some(state.selected_job),
        theme,
    );
}

pub fn render_log(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let title = match state.selected_job() {
        Some(job) => format!("Log {} {}", job.id, job.title),
        None => "Log".to_string(),
    };
    let block = panel_block(title, false, theme);
    let inner_height = block.inner(area).height as usize;
    let Some(log) = state.selected_log() else {
        let hint = Paragraph::new(Line::styled(
            "Select a target and press g to generate it, G for all.",
            theme.muted,
        ))
        .block(block);
        frame.render_widget(hint, area);
        return;
    };
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(log.len() + 1);
    if log.dropped() > 0 {
        lines.push(Line::styled(
            format!("... {} earlier lines dropped", log.dropped()),
            theme.muted,
        ));
    }
    lines.extend(log.lines().map(|line| {
        if line.starts_with("-- ") {
            Line::styled(line.to_string(), theme.accent)
        } else {
            Line::raw(line.to_string())
        }
    }));
    let bottom = lines.len().saturating_sub(inner_height);
    let top = bottom.saturating_sub(state.log_scroll as usize);
    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, area);
}

fn kind_style(kind: ChangeKind, theme: &Theme) -> Style {
    match kind {
        ChangeKind::Added => theme.diff_add,
        ChangeKind::Deleted => theme.diff_remove,
        ChangeKind::Modified | ChangeKind::Renamed => theme.diff_change,
    }
}

pub fn render_changes(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let focused = state.focus == Focus::Changes;
    let Some(set) = &state.changes else {
        let text = if state.changes_loading {
            "Collecting changes..."
        } else {
            "No change set yet. Press r to collect."
        };
        let paragraph = Paragraph::new(Line::styled(text, theme.muted))
            .block(panel_block("Changes".to_string(), focused, theme));
        frame.render_widget(paragraph, area);
        return;
    };

    let source = match set.source {
        ChangeSource::Git => "git".to_string(),
        ChangeSource::Snapshot => match set.snapshot_taken_at {
            Some(taken) => format!("snapshot {}", taken.format("%H:%M:%S")),
            None => "snapshot".to_string(),
        },
    };
    let loading = if state.changes_loading { " ..." } else { "" };
    let title = format!("Changes [{source}] {}{loading}", set.counts().summary());

    let mut items: Vec<ListItem<'static>> = Vec::new();
    for target in set.iter() {
        for file in target.files() {
            let mut spans = vec![
                Span::styled(format!("{} ", file.kind.short()), kind_style(file.kind, theme)),
                Span::styled(format!("{:<9}", target.title), theme.muted),
                Span::raw(file.path.clone()),
            ];
            if file.status_label != file.kind.as_str() {
                spans.push(Span::styled(format!("  ({})", file.status_label), theme.muted));
            }
            items.push(ListItem::new(Line::from(spans)));
        }
    }
    if items.is_empty() {
        let message = set.warning.clone().unwrap_or_else(|| "No changes.".to_string());
        let paragraph = Paragraph::new(Line::styled(message, theme.muted))
            .block(panel_block(title, focused, theme));
        frame.render_widget(paragraph, area);
        return;
    }
    render_list(
        frame,
        area,
        panel_block(title, focused, theme),
        items,
        Some(state.selected_change).filter(|_| focused),
        theme,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use creator_panel::jobs::JobId;

    #[test]
    fn elapsed_is_minutes_and_seconds() {
        let finished = Utc::now();
        let job = JobStatus {
            id: JobId(1),
            title: "API".into(),
            phase: JobPhase::Succeeded,
            started_at: Some(finished - Duration::seconds(125)),
            finished_at: Some(finished),
            last_error: None,
            cancel_requested: false,
        };
        assert_eq!(format_elapsed(&job), "2:05");

        let queued = JobStatus {
            started_at: None,
            finished_at: None,
            ..job
        };
        assert_eq!(format_elapsed(&queued), "");
    }
}
