use unicode_width::UnicodeWidthChar;

use super::types::{DiffChunk, DiffOp};

const TAB_WIDTH: usize = 4;

/// Marker appended when rendering stops at the line cap.
pub fn truncation_marker(remaining: usize) -> String {
    format!("... diff truncated ({remaining} more lines)")
}

/// Renders chunks as `-`/`+`/space prefixed lines, emitting at most
/// `max_lines` lines before the truncation marker.
pub fn render_unified(chunks: &[DiffChunk], max_lines: usize) -> String {
    let rows = chunks.iter().flat_map(|chunk| {
        let prefix = chunk.op.prefix();
        chunk.lines.iter().map(move |line| format!("{prefix}{line}"))
    });
    cap_rows(rows, max_lines)
}

/// Renders chunks as two columns, base on the left and head on the right.
///
/// Each column is padded or truncated to `column_width` display cells. A run
/// of deletions directly followed by insertions is paired row by row.
pub fn render_side_by_side(chunks: &[DiffChunk], column_width: usize, max_lines: usize) -> String {
    let rows = side_by_side_rows(chunks).into_iter().map(|row| {
        format!(
            "{} {} {}",
            fit_column(row.left.unwrap_or(""), column_width),
            row.marker,
            fit_column(row.right.unwrap_or(""), column_width)
        )
    });
    cap_rows(rows, max_lines)
}

struct Row<'a> {
    left: Option<&'a str>,
    marker: char,
    right: Option<&'a str>,
}

fn side_by_side_rows(chunks: &[DiffChunk]) -> Vec<Row<'_>> {
    let mut rows = Vec::new();
    let mut idx = 0;
    while idx < chunks.len() {
        let chunk = &chunks[idx];
        match chunk.op {
            DiffOp::Equal => rows.extend(chunk.lines.iter().map(|line| Row {
                left: Some(line.as_str()),
                marker: ' ',
                right: Some(line.as_str()),
            })),
            DiffOp::Delete => {
                let inserted = chunks
                    .get(idx + 1)
                    .filter(|next| next.op == DiffOp::Insert)
                    .map(|next| next.lines.as_slice())
                    .unwrap_or(&[]);
                if !inserted.is_empty() {
                    idx += 1;
                }
                let height = chunk.lines.len().max(inserted.len());
                for k in 0..height {
                    let left = chunk.lines.get(k).map(String::as_str);
                    let right = inserted.get(k).map(String::as_str);
                    let marker = match (left, right) {
                        (Some(_), Some(_)) => '|',
                        (Some(_), None) => '<',
                        _ => '>',
                    };
                    rows.push(Row {
                        left,
                        marker,
                        right,
                    });
                }
            }
            DiffOp::Insert => rows.extend(chunk.lines.iter().map(|line| Row {
                left: None,
                marker: '>',
                right: Some(line.as_str()),
            })),
        }
        idx += 1;
    }
    rows
}

fn fit_column(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        if ch == '\t' {
            let spaces = TAB_WIDTH.min(width - used);
            out.extend(std::iter::repeat(' ').take(spaces));
            used += spaces;
            if used >= width {
                break;
            }
            continue;
        }
        let cell = ch.width().unwrap_or(0);
        if used + cell > width {
            break;
        }
        out.push(ch);
        used += cell;
    }
    out.extend(std::iter::repeat(' ').take(width - used));
    out
}

fn cap_rows(rows: impl Iterator<Item = String>, max_lines: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut remaining = 0usize;
    for row in rows {
        if out.len() < max_lines {
            out.push(row);
        } else {
            remaining += 1;
        }
    }
    if remaining > 0 {
        out.push(truncation_marker(remaining));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;

    #[test]
    fn unified_uses_prefixes() {
        let chunks = diff(&["a", "b"], &["a", "c"]);
        assert_eq!(render_unified(&chunks, 100), " a\n-b\n+c");
    }

    #[test]
    fn unified_truncates_rendering_only() {
        let base: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        let empty: Vec<String> = Vec::new();
        let chunks = diff(&empty, &base);
        assert_eq!(chunks[0].lines.len(), 10);

        let rendered = render_unified(&chunks, 3);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "+line 2");
        assert_eq!(lines[3], truncation_marker(7));
    }

    #[test]
    fn side_by_side_pairs_replacements() {
        let chunks = diff(&["same", "old"], &["same", "new", "extra"]);
        let rendered = render_side_by_side(&chunks, 5, 100);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "same    same ");
        assert_eq!(lines[1], "old   | new  ");
        assert_eq!(lines[2], "      > extra");
    }

    #[test]
    fn side_by_side_truncates_each_column() {
        let chunks = diff(&["abcdefgh"], &["xyz"]);
        let rendered = render_side_by_side(&chunks, 4, 100);
        assert_eq!(rendered, "abcd | xyz ");
    }

    #[test]
    fn fit_column_respects_wide_chars() {
        assert_eq!(fit_column("日本語", 5), "日本 ");
        assert_eq!(fit_column("\tx", 6), "    x ");
    }
}
