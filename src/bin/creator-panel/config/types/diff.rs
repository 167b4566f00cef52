use serde::{Deserialize, Serialize};

use creator_panel::changes::DiffRenderOptions;
use creator_panel::diff::{DEFAULT_COLUMN_WIDTH, DEFAULT_MAX_LINES};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiffConfig {
    pub max_lines: usize,
    pub column_width: usize,
    pub side_by_side: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            column_width: DEFAULT_COLUMN_WIDTH,
            side_by_side: false,
        }
    }
}

impl DiffConfig {
    pub fn render_options(&self, side_by_side: bool) -> DiffRenderOptions {
        DiffRenderOptions {
            max_lines: self.max_lines,
            column_width: self.column_width,
            side_by_side,
        }
    }
}
