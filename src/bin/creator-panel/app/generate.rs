use creator_panel::jobs::{JobEvent, JobPhase};

use super::commands::print_change_set;
use super::session::resolve_targets;
use super::Session;

/// Headless generation: snapshot, run every target's generator under the
/// parallelism limit, then print the change set. Ctrl-C cancels the jobs.
pub(super) async fn run_generate(
    session: &Session,
    keys: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let defs = resolve_targets(keys)?;
    let requests = defs
        .iter()
        .map(|def| session.generate_request(def))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let keys: Vec<&'static str> = defs.iter().map(|def| def.key).collect();
    match session.prepare_snapshot(keys).await {
        Ok(record) => eprintln!("snapshot captured at {}", record.root.display()),
        Err(err) => {
            log::warn!("snapshot failed: {err:#}");
            eprintln!("warning: snapshot failed, snapshot diffs will be unavailable: {err:#}");
        }
    }

    let (mut manager, mut rx) = session.job_manager();
    let ids: Vec<_> = requests
        .into_iter()
        .map(|request| manager.enqueue(request))
        .collect();

    while !manager.is_idle() {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                manager.handle_event(&event);
                if let Some(line) = describe_event(&event) {
                    eprintln!("{line}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let cancelled = manager.cancel_all();
                eprintln!("interrupt: cancelling {cancelled} job(s)");
            }
        }
    }

    let set = session.collect_changes().await?;
    print_change_set(&set, json)?;

    let unsuccessful = ids
        .iter()
        .filter_map(|id| manager.status(*id))
        .filter(|status| status.phase != JobPhase::Succeeded)
        .count();
    if unsuccessful > 0 {
        anyhow::bail!("{unsuccessful} of {} generation job(s) did not succeed", ids.len());
    }
    Ok(())
}

/// One console line per event, log lines prefixed by their job title.
fn describe_event(event: &JobEvent) -> Option<String> {
    match event {
        JobEvent::Started { title, .. } => Some(format!("==> {title} started")),
        JobEvent::Log { title, line, .. } if !line.trim().is_empty() => {
            Some(format!("[{title}] {line}"))
        }
        JobEvent::Log { .. } => None,
        JobEvent::Finished { title, error: None, .. } => Some(format!("==> {title} finished")),
        JobEvent::Finished {
            title,
            error: Some(err),
            ..
        } => Some(format!("==> {title} ended: {err}")),
        JobEvent::Cancelled { title, .. } => Some(format!("==> {title} cancelled before start")),
    }
}
