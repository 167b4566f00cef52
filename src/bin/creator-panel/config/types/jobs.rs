use serde::{Deserialize, Serialize};

use creator_panel::jobs::{DEFAULT_PTY_COLS, DEFAULT_PTY_ROWS};

use super::DEFAULT_MAX_PARALLEL;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Jobs allowed to run at once; values below 1 are treated as 1.
    pub max_parallel: usize,
    pub pty_rows: u16,
    pub pty_cols: u16,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            pty_rows: DEFAULT_PTY_ROWS,
            pty_cols: DEFAULT_PTY_COLS,
        }
    }
}
