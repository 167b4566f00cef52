//! Line diffing between two versions of a file.
//!
//! [`diff`] computes a minimal alignment of two line sequences; the render
//! functions turn the resulting chunks into text for the panel.

mod lcs;
mod render;
mod types;

pub use lcs::diff;
pub use render::{render_side_by_side, render_unified, truncation_marker};
pub use types::{DiffChunk, DiffOp, DiffStats};

/// Default cap on rendered diff lines.
pub const DEFAULT_MAX_LINES: usize = 400;

/// Default width of one side-by-side column.
pub const DEFAULT_COLUMN_WIDTH: usize = 60;

/// Splits file contents on `\n`. A trailing newline does not produce an
/// empty final line. Carriage returns are kept, so a switch between `\r\n`
/// and `\n` endings shows up as changed lines.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').map(str::to_string).collect()
}

/// Replays the delete and equal chunks, which yields the base sequence.
pub fn reconstruct_base(chunks: &[DiffChunk]) -> Vec<String> {
    chunks
        .iter()
        .filter(|chunk| chunk.op != DiffOp::Insert)
        .flat_map(|chunk| chunk.lines.iter().cloned())
        .collect()
}

/// Replays the insert and equal chunks, which yields the head sequence.
pub fn reconstruct_head(chunks: &[DiffChunk]) -> Vec<String> {
    chunks
        .iter()
        .filter(|chunk| chunk.op != DiffOp::Delete)
        .flat_map(|chunk| chunk.lines.iter().cloned())
        .collect()
}
