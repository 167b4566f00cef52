use std::fmt::Write as _;

use anyhow::Context;
use creator_panel::changes::all_targets;
use creator_panel::GenerateChangeSet;

use super::Session;

pub(super) fn list_targets() {
    for def in all_targets() {
        let paths: Vec<&str> = def.paths().collect();
        println!("{:<8} {:<10} {}", def.key, def.title, paths.join(", "));
    }
}

pub(super) async fn show_changes(session: &Session, json: bool) -> anyhow::Result<()> {
    let set = session.collect_changes().await?;
    print_change_set(&set, json)
}

pub(super) async fn show_diff(
    session: &Session,
    path: &str,
    side_by_side: bool,
) -> anyhow::Result<()> {
    let set = session.collect_changes().await?;
    let change = set
        .find_file(path)
        .cloned()
        .with_context(|| format!("no change recorded for {path}"))?;
    let text = session.render_diff(change, side_by_side).await?.text;
    print!("{text}");
    if !text.is_empty() && !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub(super) fn print_change_set(set: &GenerateChangeSet, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(set)?);
    } else {
        print!("{}", format_change_set(set));
    }
    Ok(())
}

pub(super) fn format_change_set(set: &GenerateChangeSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "source: {}", set.source);
    if let Some(taken) = set.snapshot_taken_at {
        let _ = writeln!(out, "snapshot: {}", taken.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(warning) = &set.warning {
        let _ = writeln!(out, "warning: {warning}");
    }
    if set.is_empty() {
        let _ = writeln!(out, "no changes");
        return out;
    }
    for target in set.iter() {
        let _ = writeln!(out, "{} ({}): {}", target.key, target.title, target.counts().summary());
        for file in target.files() {
            if file.status_label == file.kind.as_str() {
                let _ = writeln!(out, "  {} {}", file.kind.short(), file.path);
            } else {
                let _ = writeln!(
                    out,
                    "  {} {} ({})",
                    file.kind.short(),
                    file.path,
                    file.status_label
                );
            }
        }
    }
    let _ = writeln!(out, "total: {}", set.counts().summary());
    out
}
