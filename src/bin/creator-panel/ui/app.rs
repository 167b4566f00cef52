use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Text;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::runtime::AppState;

use super::diff_viewer::render_diff_viewer;
use super::panels::{render_changes, render_jobs, render_log, render_targets};
use super::status::{build_status_line, render_status};
use super::theme::Theme;

const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 16;
const TARGETS_WIDTH: u16 = 26;
const STATUS_HEIGHT: u16 = 1;
const CHANGES_PCT: u16 = 35;
const OVERLAY_WIDTH_PCT: u16 = 90;
const OVERLAY_HEIGHT_PCT: u16 = 85;

pub fn render_app(frame: &mut Frame<'_>, state: &AppState) {
    let theme = Theme::resolve(&state.ui.theme);
    let size = frame.area();
    if size.width < MIN_WIDTH || size.height < MIN_HEIGHT {
        render_too_small(frame, size, &theme);
        return;
    }
    let areas = split_areas(size, state);
    render_targets(frame, areas.targets, state, &theme);
    render_jobs(frame, areas.jobs, state, &theme);
    render_log(frame, areas.log, state, &theme);
    render_changes(frame, areas.changes, state, &theme);
    render_status(frame, areas.status, build_status_line(state, &theme), &theme);
    if let Some(overlay) = &state.overlay {
        render_diff_viewer(
            frame,
            centered_rect(OVERLAY_WIDTH_PCT, OVERLAY_HEIGHT_PCT, size),
            overlay,
            &theme,
        );
    }
}

struct MainAreas {
    targets: Rect,
    jobs: Rect,
    log: Rect,
    changes: Rect,
    status: Rect,
}

fn split_areas(area: Rect, state: &AppState) -> MainAreas {
    // Borders take two rows.
    let top_h = (state.targets.len() as u16 + 2).max(state.jobs.len().min(8) as u16 + 2);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(top_h),
            Constraint::Min(3),
            Constraint::Percentage(CHANGES_PCT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(TARGETS_WIDTH), Constraint::Min(20)])
        .split(rows[0]);
    MainAreas {
        targets: top[0],
        jobs: top[1],
        log: rows[1],
        changes: rows[2],
        status: rows[3],
    }
}

fn render_too_small(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let message = format!(
        "Terminal too small (min {}x{}). Resize to continue.",
        MIN_WIDTH, MIN_HEIGHT
    );
    let paragraph = Paragraph::new(Text::from(message))
        .block(Block::default().borders(Borders::ALL).title("creator-panel"))
        .style(theme.error);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    const FULL_PERCENT: u16 = 100;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((FULL_PERCENT - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((FULL_PERCENT - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((FULL_PERCENT - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((FULL_PERCENT - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(state: &AppState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render_app(frame, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_every_panel() {
        let state = AppState::new("/p".into(), &AppConfig::default());
        let text = screen(&state, 100, 30);
        for title in ["Targets", "Jobs", "Log", "Changes", "Database", "parallel 2"] {
            assert!(text.contains(title), "missing {title}:\n{text}");
        }
    }

    #[test]
    fn tiny_terminal_shows_resize_hint() {
        let state = AppState::new("/p".into(), &AppConfig::default());
        assert!(screen(&state, 40, 10).contains("Terminal too small"));
    }
}
