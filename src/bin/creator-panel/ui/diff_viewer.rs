use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use crate::runtime::{DiffBody, DiffOverlay};

use super::theme::Theme;

const DIFF_HELP_HEIGHT: u16 = 1;
const HEADER_PREFIXES: [&str; 5] = ["@@", "diff ", "index ", "--- ", "+++ "];

pub fn render_diff_viewer(frame: &mut Frame<'_>, area: Rect, overlay: &DiffOverlay, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_focused)
        .title(overlay_title(overlay));
    frame.render_widget(Clear, area);
    frame.render_widget(block.clone(), area);
    let inner = block.inner(area);
    if inner.height == 0 {
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(DIFF_HELP_HEIGHT)])
        .split(inner);
    let paragraph = Paragraph::new(build_diff_text(overlay, theme)).scroll((overlay.scroll, 0));
    frame.render_widget(paragraph, chunks[0]);
    let help = Paragraph::new("↑/↓ scroll · PgUp/PgDn page · s toggle layout · Esc close")
        .style(theme.muted);
    frame.render_widget(help, chunks[1]);
}

fn overlay_title(overlay: &DiffOverlay) -> String {
    let mode = if overlay.side_by_side {
        "side-by-side"
    } else {
        "unified"
    };
    match overlay.stats {
        Some(stats) => format!(
            " {} ({mode}) +{} -{} ",
            overlay.path, stats.added, stats.removed
        ),
        None => format!(" {} ({mode}) ", overlay.path),
    }
}

fn build_diff_text(overlay: &DiffOverlay, theme: &Theme) -> Text<'static> {
    match &overlay.body {
        DiffBody::Loading => Text::from(Line::styled("Loading diff...", theme.muted)),
        DiffBody::Failed(message) => Text::from(Line::styled(message.clone(), theme.error)),
        DiffBody::Ready(body) => Text::from(
            body.lines()
                .map(|line| {
                    let style = if overlay.side_by_side {
                        side_by_side_style(line, overlay.column_width, theme)
                    } else {
                        unified_style(line, theme)
                    };
                    Line::styled(line.to_string(), style)
                })
                .collect::<Vec<_>>(),
        ),
    }
}

fn unified_style(line: &str, theme: &Theme) -> Style {
    if HEADER_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        theme.diff_header
    } else if line.starts_with('+') {
        theme.diff_add
    } else if line.starts_with('-') {
        theme.diff_remove
    } else if line.starts_with("... ") {
        theme.muted
    } else {
        Style::default()
    }
}

fn side_by_side_style(line: &str, column_width: usize, theme: &Theme) -> Style {
    match row_marker(line, column_width) {
        Some('<') => theme.diff_remove,
        Some('>') => theme.diff_add,
        Some('|') => theme.diff_change,
        _ if line.starts_with("... ") => theme.muted,
        _ => Style::default(),
    }
}

/// Marker between the two columns of a side-by-side row: the character after
/// the left column and its separating space.
fn row_marker(line: &str, column_width: usize) -> Option<char> {
    let mut used = 0;
    let mut chars = line.chars();
    while used < column_width {
        used += chars.next()?.width().unwrap_or(0);
    }
    chars.next()?;
    chars.next()
}
