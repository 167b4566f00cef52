use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::diff::{
    diff, render_side_by_side, render_unified, split_lines, truncation_marker, DiffStats,
    DEFAULT_COLUMN_WIDTH, DEFAULT_MAX_LINES,
};
use crate::error::ChangeError;

use super::git::git_command;
use super::snapshot::SnapshotStore;
use super::types::{ChangeKind, ChangeSource, GenerateFileChange};

#[cfg(unix)]
const NULL_DEVICE: &str = "/dev/null";
#[cfg(not(unix))]
const NULL_DEVICE: &str = "NUL";

/// How a single-file diff is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRenderOptions {
    pub max_lines: usize,
    pub column_width: usize,
    pub side_by_side: bool,
}

impl Default for DiffRenderOptions {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            column_width: DEFAULT_COLUMN_WIDTH,
            side_by_side: false,
        }
    }
}

/// Rendered diff text plus line totals for the whole file. The totals are
/// taken before the text is capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiff {
    pub text: String,
    pub stats: DiffStats,
}

/// Renders the diff of one changed file using the collector that produced it.
pub fn render_file_diff(
    project: &Path,
    change: &GenerateFileChange,
    store: &SnapshotStore,
    options: DiffRenderOptions,
) -> Result<RenderedDiff, ChangeError> {
    match change.source {
        ChangeSource::Git => git_file_diff(project, change, options.max_lines),
        ChangeSource::Snapshot => snapshot_file_diff(project, change, store, options),
    }
}

fn git_file_diff(
    project: &Path,
    change: &GenerateFileChange,
    max_lines: usize,
) -> Result<RenderedDiff, ChangeError> {
    let mut cmd = git_command(project);
    cmd.args(["--no-pager", "diff", "--color=never"]);
    // Staged and unstaged edits are both compared against HEAD.
    let no_index = change.kind == ChangeKind::Added;
    match (change.kind, change.old_path.as_deref()) {
        (ChangeKind::Added, _) => {
            cmd.args(["--no-index", NULL_DEVICE, change.path.as_str()]);
        }
        (ChangeKind::Renamed, Some(old)) => {
            cmd.args(["HEAD", "-M", "--", old, change.path.as_str()]);
        }
        _ => {
            cmd.args(["HEAD", "--", change.path.as_str()]);
        }
    }
    let output = cmd.output().map_err(ChangeError::GitSpawn)?;
    // `--no-index` exits with 1 when the inputs differ.
    let ok = output.status.success() || (no_index && output.status.code() == Some(1));
    if !ok {
        return Err(ChangeError::GitFailed {
            command: "diff".to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(RenderedDiff {
        stats: DiffStats::from_unified_text(&text),
        text: cap_text(&text, max_lines),
    })
}

fn cap_text(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return lines.join("\n");
    }
    let mut out = lines[..max_lines].join("\n");
    out.push('\n');
    out.push_str(&truncation_marker(lines.len() - max_lines));
    out
}

fn snapshot_file_diff(
    project: &Path,
    change: &GenerateFileChange,
    store: &SnapshotStore,
    options: DiffRenderOptions,
) -> Result<RenderedDiff, ChangeError> {
    let base_path = store.baseline_file(project, &change.target_key, &change.path);
    let base = match base_path {
        Some(path) => read_optional(&path)?,
        None => String::new(),
    };
    let head = read_optional(&project.join(&change.path))?;
    let chunks = diff(&split_lines(&base), &split_lines(&head));
    let text = if options.side_by_side {
        render_side_by_side(&chunks, options.column_width, options.max_lines)
    } else {
        render_unified(&chunks, options.max_lines)
    };
    Ok(RenderedDiff {
        stats: DiffStats::from_chunks(&chunks),
        text,
    })
}

fn read_optional(path: &Path) -> Result<String, ChangeError> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(ChangeError::io(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::git::collect_git_changes;
    use crate::changes::git::test_repo::{commit_all, git, git_available, init_repo};
    use crate::changes::targets::all_targets;
    use crate::changes::types::GenerateChangeSet;

    fn git_set(project: &Path) -> GenerateChangeSet {
        let changes = collect_git_changes(project, all_targets()).unwrap().unwrap();
        GenerateChangeSet::from_changes(ChangeSource::Git, changes, all_targets())
    }

    fn git_diff(project: &Path, set: &GenerateChangeSet, path: &str) -> String {
        let change = set.find_file(path).unwrap();
        render_file_diff(project, change, &SnapshotStore::new(), DiffRenderOptions::default())
            .unwrap()
            .text
    }

    #[test]
    fn snapshot_diff_renders_unified_lines() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        fs::create_dir_all(project.join("apps/api")).unwrap();
        fs::write(project.join("apps/api/main.go"), "a\nb\nc\n").unwrap();
        let store = SnapshotStore::new();
        store.prepare(project, &["api"]).unwrap();
        fs::write(project.join("apps/api/main.go"), "a\nx\nc\n").unwrap();

        let set = store.collect_changes(project, all_targets()).unwrap();
        let change = set.find_file("apps/api/main.go").unwrap();
        let rendered =
            render_file_diff(project, change, &store, DiffRenderOptions::default()).unwrap();
        assert_eq!(rendered.text, " a\n-b\n+x\n c");
        assert_eq!((rendered.stats.added, rendered.stats.removed), (1, 1));

        let options = DiffRenderOptions {
            side_by_side: true,
            column_width: 3,
            ..DiffRenderOptions::default()
        };
        let text = render_file_diff(project, change, &store, options).unwrap().text;
        assert_eq!(text.lines().nth(1), Some("b   | x  "));
    }

    #[test]
    fn line_ending_change_is_not_an_empty_diff() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        fs::create_dir_all(project.join("db")).unwrap();
        fs::write(project.join("db/seed.sql"), "insert 1;\r\ninsert 2;\r\n").unwrap();
        let store = SnapshotStore::new();
        store.prepare(project, &["db"]).unwrap();
        fs::write(project.join("db/seed.sql"), "insert 1;\ninsert 2;\n").unwrap();

        let set = store.collect_changes(project, all_targets()).unwrap();
        let change = set.find_file("db/seed.sql").unwrap();
        let rendered =
            render_file_diff(project, change, &store, DiffRenderOptions::default()).unwrap();
        assert!(!rendered.text.trim().is_empty());
        assert_eq!((rendered.stats.added, rendered.stats.removed), (2, 2));
    }

    #[test]
    fn deleted_snapshot_file_diffs_against_empty() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        fs::create_dir_all(project.join("db")).unwrap();
        fs::write(project.join("db/seed.sql"), "insert 1;\ninsert 2;\n").unwrap();
        let store = SnapshotStore::new();
        store.prepare(project, &["db"]).unwrap();
        fs::remove_file(project.join("db/seed.sql")).unwrap();

        let set = store.collect_changes(project, all_targets()).unwrap();
        let change = set.find_file("db/seed.sql").unwrap();
        let options = DiffRenderOptions {
            max_lines: 1,
            ..DiffRenderOptions::default()
        };
        let rendered = render_file_diff(project, change, &store, options).unwrap();
        assert_eq!(rendered.text, format!("-insert 1;\n{}", truncation_marker(1)));
        assert_eq!(rendered.stats.removed, 2);
    }

    #[test]
    fn cap_text_appends_marker() {
        assert_eq!(cap_text("a\nb\nc\n", 5), "a\nb\nc");
        assert_eq!(cap_text("a\nb\nc\n", 2), format!("a\nb\n{}", truncation_marker(1)));
    }

    #[test]
    fn git_diff_covers_staged_additions_and_edits() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        init_repo(project);
        fs::create_dir_all(project.join("apps/api")).unwrap();
        fs::write(project.join("apps/api/main.go"), "a\nb\n").unwrap();
        commit_all(project, "init");

        fs::create_dir_all(project.join("docker")).unwrap();
        fs::write(project.join("docker/Dockerfile"), "FROM scratch\n").unwrap();
        fs::write(project.join("apps/api/main.go"), "a\nc\n").unwrap();
        fs::create_dir_all(project.join("db")).unwrap();
        fs::write(project.join("db/new.sql"), "insert 1;\n").unwrap();
        git(project, &["add", "docker/Dockerfile", "apps/api/main.go"]);

        let set = git_set(project);
        let staged_new = git_diff(project, &set, "docker/Dockerfile");
        assert!(staged_new.contains("+FROM scratch"), "{staged_new}");
        let staged_edit = git_diff(project, &set, "apps/api/main.go");
        assert!(staged_edit.contains("-b") && staged_edit.contains("+c"), "{staged_edit}");
        let untracked = git_diff(project, &set, "db/new.sql");
        assert!(untracked.contains("+insert 1;"), "{untracked}");
    }

    #[test]
    fn git_diff_follows_staged_renames() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        init_repo(project);
        fs::create_dir_all(project.join("apps/web")).unwrap();
        let body: String = (0..20).map(|n| format!("line {n}\n")).collect();
        fs::write(project.join("apps/web/old.tsx"), &body).unwrap();
        commit_all(project, "init");

        git(project, &["mv", "apps/web/old.tsx", "apps/web/new.tsx"]);
        fs::write(project.join("apps/web/new.tsx"), format!("{body}line 20\n")).unwrap();
        git(project, &["add", "apps/web/new.tsx"]);

        let set = git_set(project);
        let change = set.find_file("apps/web/new.tsx").unwrap();
        assert_eq!(change.kind, ChangeKind::Renamed);
        let text = git_diff(project, &set, "apps/web/new.tsx");
        assert!(text.contains("rename from apps/web/old.tsx"), "{text}");
        assert!(text.contains("+line 20"), "{text}");
    }
}
