use serde::Serialize;

/// Operation applied to a run of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Equal,
    Insert,
    Delete,
}

impl DiffOp {
    /// Prefix used by the unified renderer.
    pub const fn prefix(self) -> char {
        match self {
            Self::Equal => ' ',
            Self::Insert => '+',
            Self::Delete => '-',
        }
    }
}

/// A maximal run of lines sharing the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffChunk {
    pub op: DiffOp,
    pub lines: Vec<String>,
}

impl DiffChunk {
    pub fn new(op: DiffOp, lines: Vec<String>) -> Self {
        Self { op, lines }
    }
}

/// Line totals for a diff result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn from_chunks(chunks: &[DiffChunk]) -> Self {
        chunks.iter().fold(Self::default(), |mut stats, chunk| {
            match chunk.op {
                DiffOp::Equal => stats.unchanged += chunk.lines.len(),
                DiffOp::Insert => stats.added += chunk.lines.len(),
                DiffOp::Delete => stats.removed += chunk.lines.len(),
            }
            stats
        })
    }

    /// Counts the body lines of unified diff text, such as `git diff`
    /// output. File and hunk headers are skipped.
    pub fn from_unified_text(text: &str) -> Self {
        let mut stats = Self::default();
        let mut in_hunk = false;
        for line in text.lines() {
            if line.starts_with("@@") {
                in_hunk = true;
                continue;
            }
            if line.starts_with("diff ") {
                in_hunk = false;
                continue;
            }
            if !in_hunk {
                continue;
            }
            match line.chars().next() {
                Some('+') => stats.added += 1,
                Some('-') => stats.removed += 1,
                Some(' ') => stats.unchanged += 1,
                _ => {}
            }
        }
        stats
    }

    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_chunk_lines() {
        let chunks = vec![
            DiffChunk::new(DiffOp::Equal, vec!["a".into()]),
            DiffChunk::new(DiffOp::Delete, vec!["b".into(), "c".into()]),
            DiffChunk::new(DiffOp::Insert, vec!["x".into()]),
        ];
        let stats = DiffStats::from_chunks(&chunks);
        assert_eq!(
            stats,
            DiffStats {
                added: 1,
                removed: 2,
                unchanged: 1
            }
        );
        assert!(!stats.is_unchanged());
    }

    #[test]
    fn unified_text_skips_file_headers() {
        let text = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n keep\n--- old\n+new\n";
        let stats = DiffStats::from_unified_text(text);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unchanged, 1);
        assert!(DiffStats::from_unified_text("").is_unchanged());
    }
}
