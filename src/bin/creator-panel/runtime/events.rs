use crossterm::event::KeyEvent;

use creator_panel::changes::RenderedDiff;
use creator_panel::jobs::JobEvent;
use creator_panel::{GenerateChangeSet, SnapshotRecord};

#[derive(Debug)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Everything the controller reacts to. Background work reports back with
/// the `Snapshot`, `Changes` and `Diff` variants; errors arrive as text.
#[derive(Debug)]
pub enum AppEvent {
    Input(InputEvent),
    Tick,
    Job(JobEvent),
    Snapshot {
        keys: Vec<&'static str>,
        result: Result<SnapshotRecord, String>,
    },
    Changes {
        request: u64,
        result: Result<GenerateChangeSet, String>,
    },
    Diff {
        path: String,
        side_by_side: bool,
        result: Result<RenderedDiff, String>,
    },
}
