use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::runtime::{AppState, NoticeLevel};

use super::theme::Theme;

const PROJECT_MIN_WIDTH: u16 = 80;
const KEYS_MIN_WIDTH: u16 = 110;
const KEYS_HINT: &str = "g gen · G all · x cancel · +/- parallel · r refresh · q quit";

pub struct StatusLine {
    pub left: Vec<Span<'static>>,
    pub right: Vec<Span<'static>>,
}

impl StatusLine {
    pub fn new(left: Vec<Span<'static>>, right: Vec<Span<'static>>) -> Self {
        Self { left, right }
    }
}

pub fn render_status(frame: &mut Frame<'_>, area: Rect, line: StatusLine, theme: &Theme) {
    let left_width = spans_width(&line.left);
    let right_width = spans_width(&line.right);
    let filler_width = area.width.saturating_sub(left_width + right_width);
    let filler = Span::styled(" ".repeat(filler_width as usize), theme.status);
    let mut spans = Vec::with_capacity(line.left.len() + line.right.len() + 1);
    spans.extend(line.left);
    spans.push(filler);
    spans.extend(line.right);
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn spans_width(spans: &[Span<'static>]) -> u16 {
    spans.iter().map(|span| span.content.width() as u16).sum()
}

pub fn build_status_line(state: &AppState, theme: &Theme) -> StatusLine {
    let width = state.terminal_size.0;
    StatusLine::new(
        build_left_spans(state, theme, width),
        build_right_spans(state, theme, width),
    )
}

fn build_left_spans(state: &AppState, theme: &Theme, width: u16) -> Vec<Span<'static>> {
    let mut spans = vec![Span::styled(
        format!(
            " parallel {} ({} running, {} queued)",
            state.max_parallel, state.running, state.queued
        ),
        theme.status,
    )];
    if width >= PROJECT_MIN_WIDTH {
        spans.push(Span::styled(
            format!(" · {}", state.project.display()),
            theme.muted,
        ));
    }
    if state.quit_requested {
        spans.push(Span::styled(" · stopping jobs, q again to force", theme.status_warn));
    }
    spans
}

fn build_right_spans(state: &AppState, theme: &Theme, width: u16) -> Vec<Span<'static>> {
    if let Some(notice) = &state.notice {
        let style = match notice.level {
            NoticeLevel::Info => theme.status_ok,
            NoticeLevel::Warn => theme.status_warn,
            NoticeLevel::Error => theme.status_error,
        };
        return vec![Span::styled(format!("{} ", notice.text), style)];
    }
    if width >= KEYS_MIN_WIDTH {
        return vec![Span::styled(format!("{KEYS_HINT} "), theme.muted)];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn text(spans: &[Span<'static>]) -> String {
        spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn notice_replaces_key_hint() {
        let theme = Theme::mono();
        let mut state = AppState::new("/work/shop".into(), &AppConfig::default());
        state.terminal_size = (160, 40);
        let line = build_status_line(&state, &theme);
        assert!(text(&line.left).contains("parallel 2 (0 running, 0 queued)"));
        assert!(text(&line.left).contains("/work/shop"));
        assert!(text(&line.right).contains("x cancel"));

        state.notify(NoticeLevel::Error, "API failed");
        let line = build_status_line(&state, &theme);
        assert_eq!(text(&line.right), "API failed ");
    }

    #[test]
    fn narrow_terminal_drops_extras() {
        let theme = Theme::mono();
        let mut state = AppState::new("/work/shop".into(), &AppConfig::default());
        state.terminal_size = (60, 20);
        let line = build_status_line(&state, &theme);
        assert!(!text(&line.left).contains("/work/shop"));
        assert!(line.right.is_empty());
    }
}
