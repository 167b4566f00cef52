use ratatui::style::{Color, Modifier, Style};

/// Unicode indicators for job phases and list selection.
pub mod indicators {
    pub const SELECTED: &str = "❯";
    pub const QUEUED: &str = "…";
    pub const RUNNING: &str = "●";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const STOPPED: &str = "■";
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Style,
    pub muted: Style,
    pub border: Style,
    pub border_focused: Style,
    pub selected: Style,
    pub error: Style,
    // Diff styles
    pub diff_add: Style,
    pub diff_remove: Style,
    pub diff_change: Style,
    pub diff_header: Style,
    // Status bar
    pub status: Style,
    pub status_ok: Style,
    pub status_warn: Style,
    pub status_error: Style,
}

impl Theme {
    /// Theme by config name; `NO_COLOR` selects `mono` regardless.
    pub fn resolve(name: &str) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        if no_color {
            return Self::mono();
        }
        Self::from_name(name)
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "mono" => Self::mono(),
            "cool" => Self::cool(),
            _ => Self::warm(),
        }
    }

    /// Orange and terracotta tones.
    pub fn warm() -> Self {
        let orange = Color::Rgb(217, 119, 87);
        let green = Color::Rgb(120, 200, 140);
        let yellow = Color::Rgb(233, 182, 89);
        let muted_gray = Color::Rgb(140, 135, 130);
        let dim_gray = Color::Rgb(100, 95, 90);
        Self::colored(orange, green, yellow, muted_gray, dim_gray)
    }

    /// Blue and cyan tones.
    pub fn cool() -> Self {
        let blue = Color::Rgb(100, 150, 220);
        let green = Color::Rgb(96, 200, 136);
        let yellow = Color::Rgb(233, 182, 89);
        let muted_gray = Color::Rgb(130, 140, 150);
        let dim_gray = Color::Rgb(90, 100, 110);
        Self::colored(blue, green, yellow, muted_gray, dim_gray)
    }

    fn colored(accent: Color, green: Color, yellow: Color, muted: Color, dim: Color) -> Self {
        Self {
            accent: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            muted: Style::default().fg(muted),
            border: Style::default().fg(dim),
            border_focused: Style::default().fg(accent),
            selected: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            diff_add: Style::default().fg(green),
            diff_remove: Style::default().fg(Color::Red),
            diff_change: Style::default().fg(yellow),
            diff_header: Style::default().fg(muted).add_modifier(Modifier::DIM),
            status: Style::default().fg(muted),
            status_ok: Style::default().fg(green),
            status_warn: Style::default().fg(yellow),
            status_error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }

    /// High contrast, no colors.
    pub fn mono() -> Self {
        let plain = Style::default();
        let bold = plain.add_modifier(Modifier::BOLD);
        let dim = plain.add_modifier(Modifier::DIM);
        Self {
            accent: bold,
            muted: dim,
            border: dim,
            border_focused: bold,
            selected: plain.add_modifier(Modifier::REVERSED),
            error: bold,
            diff_add: bold,
            diff_remove: plain.add_modifier(Modifier::CROSSED_OUT),
            diff_change: plain.add_modifier(Modifier::UNDERLINED),
            diff_header: dim,
            status: plain,
            status_ok: plain,
            status_warn: bold,
            status_error: bold.add_modifier(Modifier::REVERSED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_warm() {
        assert_eq!(
            Theme::from_name("solarized").accent,
            Theme::warm().accent
        );
        assert_eq!(Theme::from_name("COOL").accent, Theme::cool().accent);
        assert_eq!(Theme::from_name("mono").diff_add.fg, None);
    }
}
