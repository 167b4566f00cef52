//! Working-tree change listing through the git CLI.

use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::ChangeError;

use super::targets::{target_for_path, GenerateTargetDefinition};
use super::types::{ChangeKind, ChangeSource, GenerateFileChange};

const NOT_A_REPOSITORY: &str = "not a git repository";

pub(crate) fn git_command(project: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(project);
    cmd
}

fn run(project: &Path, args: &[&str]) -> Result<Option<Output>, ChangeError> {
    match git_command(project).args(args).output() {
        Ok(output) => Ok(Some(output)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ChangeError::GitSpawn(err)),
    }
}

fn failure(args: &[&str], output: &Output) -> ChangeError {
    ChangeError::GitFailed {
        command: args.join(" "),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Whether `project` sits inside a git working tree and git is installed.
pub fn git_usable(project: &Path) -> Result<bool, ChangeError> {
    let args = ["rev-parse", "--is-inside-work-tree"];
    let Some(output) = run(project, &args)? else {
        log::debug!("git binary not found; snapshot fallback required");
        return Ok(false);
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if stderr.contains(NOT_A_REPOSITORY) {
            return Ok(false);
        }
        return Err(failure(&args, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
}

/// Lists target-scoped changes of the working tree. `Ok(None)` means git is
/// unusable for `project` and the snapshot store must be used instead.
pub fn collect_git_changes(
    project: &Path,
    targets: &[GenerateTargetDefinition],
) -> Result<Option<Vec<GenerateFileChange>>, ChangeError> {
    if !git_usable(project)? {
        return Ok(None);
    }
    let prefix_args = ["rev-parse", "--show-prefix"];
    let prefix = match run(project, &prefix_args)? {
        Some(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Some(output) => return Err(failure(&prefix_args, &output)),
        None => return Ok(None),
    };
    // Without `--untracked-files=all` a new directory is one `?? dir/` record.
    let status_args = ["status", "--porcelain=v1", "-z", "--untracked-files=all"];
    let output = match run(project, &status_args)? {
        Some(output) if output.status.success() => output,
        Some(output) => return Err(failure(&status_args, &output)),
        None => return Ok(None),
    };
    let changes = parse_records(&output.stdout, &prefix, targets);
    log::debug!(
        "git reported {} target changes under {}",
        changes.len(),
        project.display()
    );
    Ok(Some(changes))
}

/// Parses `git status --porcelain=v1 -z` output into target-scoped changes.
pub fn parse_porcelain(
    output: &[u8],
    targets: &[GenerateTargetDefinition],
) -> Vec<GenerateFileChange> {
    parse_records(output, "", targets)
}

// Porcelain paths are relative to the repository root; `prefix` is the
// project's position inside the repository.
fn parse_records(
    output: &[u8],
    prefix: &str,
    targets: &[GenerateTargetDefinition],
) -> Vec<GenerateFileChange> {
    let mut records = output
        .split(|byte| *byte == 0)
        .filter(|record| !record.is_empty());
    let mut changes = Vec::new();

    while let Some(record) = records.next() {
        if record.len() < 4 {
            continue;
        }
        let code = String::from_utf8_lossy(&record[..2]).to_string();
        let path = unquote_path(&String::from_utf8_lossy(&record[3..]));
        let Some(status) = classify(&code) else {
            continue;
        };
        let old_path = if status.kind == ChangeKind::Renamed {
            records
                .next()
                .map(|raw| unquote_path(&String::from_utf8_lossy(raw)))
        } else {
            None
        };

        let Some(path) = relative_to(prefix, &path) else {
            continue;
        };
        let Some(target) = target_for_path(targets, &path) else {
            continue;
        };
        let mut change = GenerateFileChange::new(path, status.kind, target.key, ChangeSource::Git);
        match old_path {
            Some(old) => {
                let old = relative_to(prefix, &old).unwrap_or(old);
                change = change.with_old_path(old.clone());
                if status.copied {
                    change = change.with_label(format!("copied from {old}"));
                }
            }
            None => {
                if let Some(label) = status.label {
                    change = change.with_label(label);
                }
            }
        }
        changes.push(change);
    }
    changes
}

fn relative_to(prefix: &str, path: &str) -> Option<String> {
    if prefix.is_empty() {
        return Some(path.to_string());
    }
    path.strip_prefix(prefix).map(str::to_string)
}

struct Status {
    kind: ChangeKind,
    copied: bool,
    label: Option<&'static str>,
}

impl Status {
    fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            copied: false,
            label: None,
        }
    }

    fn labelled(kind: ChangeKind, label: &'static str) -> Self {
        Self {
            kind,
            copied: false,
            label: Some(label),
        }
    }
}

fn classify(code: &str) -> Option<Status> {
    match code {
        "??" => return Some(Status::labelled(ChangeKind::Added, "untracked")),
        "!!" => return None,
        "DD" | "AU" | "UD" | "UA" | "DU" | "AA" | "UU" => {
            return Some(Status::labelled(ChangeKind::Modified, "unmerged"))
        }
        _ => {}
    }
    let has = |wanted: char| code.chars().any(|c| c == wanted);
    if has('R') {
        return Some(Status::new(ChangeKind::Renamed));
    }
    if has('C') {
        return Some(Status {
            kind: ChangeKind::Renamed,
            copied: true,
            label: None,
        });
    }
    if has('D') {
        return Some(Status::new(ChangeKind::Deleted));
    }
    if has('A') {
        return Some(Status::new(ChangeKind::Added));
    }
    if has('T') {
        return Some(Status::labelled(ChangeKind::Modified, "type changed"));
    }
    if has('M') || has('U') {
        return Some(Status::new(ChangeKind::Modified));
    }
    None
}

/// Undoes git's C-style path quoting. Unquoted input is returned unchanged.
pub fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };
    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        idx += 1;
        if byte != b'\\' || idx >= bytes.len() {
            out.push(byte);
            continue;
        }
        let escaped = bytes[idx];
        idx += 1;
        match escaped {
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b't' => out.push(b'\t'),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'0'..=b'7' => {
                let mut value = u32::from(escaped - b'0');
                let mut digits = 1;
                while digits < 3 && idx < bytes.len() && (b'0'..=b'7').contains(&bytes[idx]) {
                    value = value * 8 + u32::from(bytes[idx] - b'0');
                    idx += 1;
                    digits += 1;
                }
                out.push((value & 0xff) as u8);
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
pub(crate) mod test_repo {
    use std::path::Path;
    use std::process::Command;

    use super::git_command;

    pub(crate) fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub(crate) fn git(dir: &Path, args: &[&str]) {
        let status = git_command(dir).args(args).output().unwrap();
        assert!(status.status.success(), "git {args:?} failed");
    }

    pub(crate) fn init_repo(root: &Path) {
        git(root, &["init", "-q"]);
        git(root, &["config", "user.email", "panel@example.com"]);
        git(root, &["config", "user.name", "Panel"]);
    }

    pub(crate) fn commit_all(root: &Path, message: &str) {
        git(root, &["add", "-A"]);
        git(root, &["-c", "commit.gpgsign=false", "commit", "-q", "-m", message]);
    }
}

#[cfg(test)]
mod tests {
    use super::test_repo::{commit_all, git_available, init_repo};
    use super::*;
    use crate::changes::targets::all_targets;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case(" M", ChangeKind::Modified, "modified")]
    #[case("M ", ChangeKind::Modified, "modified")]
    #[case("MM", ChangeKind::Modified, "modified")]
    #[case(" T", ChangeKind::Modified, "type changed")]
    #[case("UU", ChangeKind::Modified, "unmerged")]
    #[case("AA", ChangeKind::Modified, "unmerged")]
    #[case("A ", ChangeKind::Added, "added")]
    #[case("AM", ChangeKind::Added, "added")]
    #[case(" D", ChangeKind::Deleted, "deleted")]
    #[case("D ", ChangeKind::Deleted, "deleted")]
    #[case("??", ChangeKind::Added, "untracked")]
    fn maps_status_codes(
        #[case] code: &str,
        #[case] kind: ChangeKind,
        #[case] label: &str,
    ) {
        let raw = format!("{code} apps/api/main.go\0");
        let changes = parse_porcelain(raw.as_bytes(), all_targets());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, kind);
        assert_eq!(changes[0].status_label, label);
        assert_eq!(changes[0].target_key, "api");
        assert_eq!(changes[0].old_path, None);
    }

    #[test]
    fn rename_consumes_exactly_one_following_record() {
        let raw = b"R  apps/web/new.tsx\0apps/web/old.tsx\0 M apps/api/a.ts\0";
        let changes = parse_porcelain(raw, all_targets());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::Renamed);
        assert_eq!(changes[0].path, "apps/web/new.tsx");
        assert_eq!(changes[0].old_path.as_deref(), Some("apps/web/old.tsx"));
        assert_eq!(changes[1].path, "apps/api/a.ts");
        assert_eq!(changes[1].kind, ChangeKind::Modified);
    }

    #[test]
    fn copy_is_reported_as_rename_with_label() {
        let raw = b"C  db/seed2.sql\0db/seed.sql\0";
        let changes = parse_porcelain(raw, all_targets());
        assert_eq!(changes[0].kind, ChangeKind::Renamed);
        assert_eq!(changes[0].status_label, "copied from db/seed.sql");
    }

    #[test]
    fn ignored_and_unowned_paths_are_dropped() {
        let raw = b"!! apps/api/node_modules/x\0?? README.md\0 M docker-compose.yml\0";
        let changes = parse_porcelain(raw, all_targets());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].target_key, "docker");
    }

    #[test]
    fn unowned_rename_still_consumes_its_origin() {
        let raw = b"R  notes/new.md\0apps/api/old.md\0 M apps/api/a.ts\0";
        let changes = parse_porcelain(raw, all_targets());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "apps/api/a.ts");
    }

    #[test]
    fn prefix_is_stripped_for_nested_projects() {
        let raw = b" M site/apps/api/a.ts\0 M other/apps/api/b.ts\0";
        let changes = parse_records(raw, "site/", all_targets());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "apps/api/a.ts");
    }

    #[test]
    fn unquotes_c_style_paths() {
        assert_eq!(unquote_path("plain/path"), "plain/path");
        assert_eq!(unquote_path(r#""with \"quote\"""#), "with \"quote\"");
        assert_eq!(unquote_path(r#""tab\there""#), "tab\there");
        assert_eq!(unquote_path(r#""line\nbreak\\""#), "line\nbreak\\");
        assert_eq!(unquote_path(r#""caf\303\251.txt""#), "café.txt");
    }

    #[test]
    fn plain_directory_is_not_usable() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        assert!(!git_usable(dir.path()).unwrap());
        assert!(collect_git_changes(dir.path(), all_targets())
            .unwrap()
            .is_none());
    }

    #[test]
    fn new_target_trees_are_listed_file_by_file() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        init_repo(root);
        fs::write(root.join("README.md"), "readme\n").unwrap();
        commit_all(root, "init");

        fs::create_dir_all(root.join("apps/api/src")).unwrap();
        fs::create_dir_all(root.join("db")).unwrap();
        fs::write(root.join("apps/api/main.go"), "package main\n").unwrap();
        fs::write(root.join("apps/api/src/a.go"), "package src\n").unwrap();
        fs::write(root.join("db/schema.sql"), "create table t;\n").unwrap();
        fs::write(root.join("db/seed.sql"), "insert 1;\n").unwrap();

        let mut changes = collect_git_changes(root, all_targets()).unwrap().unwrap();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        let summary: Vec<(&str, &str, ChangeKind)> = changes
            .iter()
            .map(|c| (c.path.as_str(), c.target_key.as_str(), c.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("apps/api/main.go", "api", ChangeKind::Added),
                ("apps/api/src/a.go", "api", ChangeKind::Added),
                ("db/schema.sql", "db", ChangeKind::Added),
                ("db/seed.sql", "db", ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn collects_changes_from_a_working_tree() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        init_repo(root);
        fs::create_dir_all(root.join("apps/api")).unwrap();
        fs::write(root.join("apps/api/main.go"), "package main\n").unwrap();
        fs::write(root.join("apps/api/gone.go"), "package main\n").unwrap();
        commit_all(root, "init");

        fs::write(root.join("apps/api/main.go"), "package main\n// edit\n").unwrap();
        fs::remove_file(root.join("apps/api/gone.go")).unwrap();
        fs::write(root.join("docker-compose.yml"), "services: {}\n").unwrap();
        fs::write(root.join("notes.txt"), "ignored\n").unwrap();

        let mut changes = collect_git_changes(root, all_targets()).unwrap().unwrap();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        let summary: Vec<(&str, ChangeKind)> =
            changes.iter().map(|c| (c.path.as_str(), c.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("apps/api/gone.go", ChangeKind::Deleted),
                ("apps/api/main.go", ChangeKind::Modified),
                ("docker-compose.yml", ChangeKind::Added),
            ]
        );
    }
}
