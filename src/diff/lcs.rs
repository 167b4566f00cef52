use super::types::{DiffChunk, DiffOp};

/// Computes a minimal line alignment of `base` against `head`.
///
/// The table holds, for every pair of suffixes, the length of their longest
/// common subsequence. Walking it from the front yields equal lines when both
/// cursors match; otherwise the cursor that keeps the longer remaining
/// subsequence advances, and on a tie the base line is deleted before the head
/// line is inserted.
pub fn diff<S: AsRef<str>>(base: &[S], head: &[S]) -> Vec<DiffChunk> {
    let n = base.len();
    let m = head.len();
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];

    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if base[i].as_ref() == head[j].as_ref() {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut builder = ChunkBuilder::default();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if base[i].as_ref() == head[j].as_ref() {
            builder.push(DiffOp::Equal, base[i].as_ref());
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            builder.push(DiffOp::Delete, base[i].as_ref());
            i += 1;
        } else {
            builder.push(DiffOp::Insert, head[j].as_ref());
            j += 1;
        }
    }
    for line in &base[i..] {
        builder.push(DiffOp::Delete, line.as_ref());
    }
    for line in &head[j..] {
        builder.push(DiffOp::Insert, line.as_ref());
    }
    builder.finish()
}

#[derive(Default)]
struct ChunkBuilder {
    chunks: Vec<DiffChunk>,
}

impl ChunkBuilder {
    fn push(&mut self, op: DiffOp, line: &str) {
        match self.chunks.last_mut() {
            Some(last) if last.op == op => last.lines.push(line.to_string()),
            _ => self.chunks.push(DiffChunk::new(op, vec![line.to_string()])),
        }
    }

    fn finish(self) -> Vec<DiffChunk> {
        self.chunks
    }
}
