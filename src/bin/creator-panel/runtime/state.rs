use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use creator_panel::changes::all_targets;
use creator_panel::diff::DiffStats;
use creator_panel::jobs::{JobId, JobStatus};
use creator_panel::{GenerateChangeSet, GenerateFileChange, GenerateTargetDefinition};

use crate::config::{AppConfig, UiConfig};

/// Lines kept per job; older lines are dropped first.
pub const LOG_CAPACITY: usize = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Targets,
    Jobs,
    Changes,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Targets => Self::Jobs,
            Self::Jobs => Self::Changes,
            Self::Changes => Self::Targets,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Targets => Self::Changes,
            Self::Jobs => Self::Targets,
            Self::Changes => Self::Jobs,
        }
    }
}

/// Bounded output buffer of one job.
#[derive(Debug, Default)]
pub struct JobLog {
    lines: VecDeque<String>,
    dropped: usize,
}

impl JobLog {
    pub fn push(&mut self, line: String) {
        if self.lines.len() == LOG_CAPACITY {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffBody {
    Loading,
    Ready(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DiffOverlay {
    pub path: String,
    pub side_by_side: bool,
    pub column_width: usize,
    pub body: DiffBody,
    /// Line totals of the loaded diff, absent until it arrives.
    pub stats: Option<DiffStats>,
    pub scroll: u16,
}

impl DiffOverlay {
    pub fn scroll_by(&mut self, delta: i32) {
        let max = match &self.body {
            DiffBody::Ready(text) => text.lines().count().saturating_sub(1),
            _ => 0,
        };
        let next = (i64::from(self.scroll) + i64::from(delta)).clamp(0, max as i64);
        self.scroll = u16::try_from(next).unwrap_or(u16::MAX);
    }
}

pub struct AppState {
    pub project: PathBuf,
    pub ui: UiConfig,
    pub column_width: usize,
    pub focus: Focus,
    pub targets: &'static [GenerateTargetDefinition],
    pub selected_target: usize,
    /// Mirror of the job manager's statuses, oldest first.
    pub jobs: Vec<JobStatus>,
    pub selected_job: usize,
    pub logs: HashMap<JobId, JobLog>,
    /// Lines scrolled up from the bottom of the log.
    pub log_scroll: u16,
    pub changes: Option<GenerateChangeSet>,
    pub changes_loading: bool,
    pub selected_change: usize,
    pub side_by_side: bool,
    pub overlay: Option<DiffOverlay>,
    pub notice: Option<Notice>,
    pub max_parallel: usize,
    pub running: usize,
    pub queued: usize,
    pub quit_requested: bool,
    pub should_quit: bool,
    pub terminal_size: (u16, u16),
}

impl AppState {
    pub fn new(project: PathBuf, config: &AppConfig) -> Self {
        Self {
            project,
            ui: config.ui.clone(),
            column_width: config.diff.column_width,
            focus: Focus::Targets,
            targets: all_targets(),
            selected_target: 0,
            jobs: Vec::new(),
            selected_job: 0,
            logs: HashMap::new(),
            log_scroll: 0,
            changes: None,
            changes_loading: false,
            selected_change: 0,
            side_by_side: config.diff.side_by_side,
            overlay: None,
            notice: None,
            max_parallel: config.jobs.max_parallel.max(1),
            running: 0,
            queued: 0,
            quit_requested: false,
            should_quit: false,
            terminal_size: (0, 0),
        }
    }

    pub fn selected_target(&self) -> Option<&'static GenerateTargetDefinition> {
        self.targets.get(self.selected_target)
    }

    pub fn selected_job(&self) -> Option<&JobStatus> {
        self.jobs.get(self.selected_job)
    }

    pub fn selected_log(&self) -> Option<&JobLog> {
        self.selected_job().and_then(|job| self.logs.get(&job.id))
    }

    pub fn change_count(&self) -> usize {
        self.changes.as_ref().map_or(0, |set| set.files().count())
    }

    pub fn selected_change(&self) -> Option<&GenerateFileChange> {
        self.changes.as_ref()?.files().nth(self.selected_change)
    }

    /// Moves the selection of the focused panel, clamped to its length.
    pub fn move_selection(&mut self, delta: isize) {
        let (index, len) = match self.focus {
            Focus::Targets => (&mut self.selected_target, self.targets.len()),
            Focus::Jobs => (&mut self.selected_job, self.jobs.len()),
            Focus::Changes => {
                let len = self.change_count();
                (&mut self.selected_change, len)
            }
        };
        *index = step(*index, delta, len);
        if self.focus == Focus::Jobs {
            self.log_scroll = 0;
        }
    }

    pub fn push_log(&mut self, id: JobId, line: String) {
        self.logs.entry(id).or_default().push(line);
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn scroll_log(&mut self, delta: i32) {
        let max = self.selected_log().map_or(0, JobLog::len);
        let next = (i64::from(self.log_scroll) + i64::from(delta)).clamp(0, max as i64);
        self.log_scroll = u16::try_from(next).unwrap_or(u16::MAX);
    }

    /// Half the terminal height, the step of page-wise scrolling.
    pub fn page(&self) -> i32 {
        i32::from((self.terminal_size.1 / 2).max(1))
    }
}

fn step(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    index.saturating_add_signed(delta).min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use creator_panel::jobs::JobPhase;

    fn state() -> AppState {
        AppState::new(PathBuf::from("/p"), &AppConfig::default())
    }

    fn status(id: u64) -> JobStatus {
        JobStatus {
            id: JobId(id),
            title: format!("job {id}"),
            phase: JobPhase::Running,
            started_at: None,
            finished_at: None,
            last_error: None,
            cancel_requested: false,
        }
    }

    #[test]
    fn focus_cycles_both_ways() {
        let focus = Focus::Targets;
        assert_eq!(focus.next().next().next(), focus);
        assert_eq!(focus.prev(), Focus::Changes);
        assert_eq!(focus.next().prev(), focus);
    }

    #[test]
    fn selection_is_clamped_per_panel() {
        let mut state = state();
        state.move_selection(-1);
        assert_eq!(state.selected_target, 0);
        state.move_selection(100);
        assert_eq!(state.selected_target, state.targets.len() - 1);

        state.focus = Focus::Jobs;
        state.move_selection(1);
        assert_eq!(state.selected_job, 0);
        state.jobs = vec![status(1), status(2)];
        state.move_selection(5);
        assert_eq!(state.selected_job, 1);
        assert_eq!(state.selected_job().map(|j| j.id), Some(JobId(2)));

        state.focus = Focus::Changes;
        state.move_selection(1);
        assert_eq!(state.selected_change, 0);
        assert!(state.selected_change().is_none());
    }

    #[test]
    fn log_keeps_most_recent_lines() {
        let mut log = JobLog::default();
        for n in 0..LOG_CAPACITY + 3 {
            log.push(n.to_string());
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.dropped(), 3);
        assert_eq!(log.lines().next(), Some("3"));
    }

    #[test]
    fn log_scroll_is_bounded_by_log_length() {
        let mut state = state();
        state.jobs = vec![status(1)];
        for n in 0..5 {
            state.push_log(JobId(1), n.to_string());
        }
        state.focus = Focus::Jobs;
        state.scroll_log(10);
        assert_eq!(state.log_scroll, 5);
        state.scroll_log(-20);
        assert_eq!(state.log_scroll, 0);
    }

    #[test]
    fn overlay_scroll_stops_at_last_line() {
        let mut overlay = DiffOverlay {
            path: "a".into(),
            side_by_side: false,
            column_width: 10,
            body: DiffBody::Ready("a\nb\nc\n".into()),
            stats: None,
            scroll: 0,
        };
        overlay.scroll_by(10);
        assert_eq!(overlay.scroll, 2);
        overlay.scroll_by(-1);
        assert_eq!(overlay.scroll, 1);
    }
}
