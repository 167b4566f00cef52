use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use creator_panel::changes::{all_targets, find_target, render_file_diff, RenderedDiff};
use creator_panel::jobs::{JobEvent, JobManager, JobRequest};
use creator_panel::{
    collect_generate_changes, GenerateChangeSet, GenerateFileChange, GenerateTargetDefinition,
    SnapshotRecord, SnapshotStore,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{AppConfig, GenerateConfig};

const ALL_TARGETS: &str = "all";

/// What every front end works against: the project, its settings, and the
/// snapshot store shared by the generate and diff paths.
#[derive(Debug, Clone)]
pub struct Session {
    pub project: PathBuf,
    pub config: AppConfig,
    pub store: Arc<SnapshotStore>,
}

impl Session {
    pub fn new(project: PathBuf, config: AppConfig) -> Self {
        Self {
            project,
            config,
            store: Arc::new(SnapshotStore::new()),
        }
    }

    pub fn job_manager(&self) -> (JobManager, UnboundedReceiver<JobEvent>) {
        let jobs = &self.config.jobs;
        let (manager, rx) = JobManager::new(jobs.max_parallel);
        (manager.with_pty_size(jobs.pty_rows, jobs.pty_cols), rx)
    }

    pub fn generate_request(&self, def: &GenerateTargetDefinition) -> anyhow::Result<JobRequest> {
        generate_request(def, &self.project, &self.config.generate)
    }

    /// Captures the baseline for `keys` off the async runtime.
    pub async fn prepare_snapshot(&self, keys: Vec<&'static str>) -> anyhow::Result<SnapshotRecord> {
        let store = Arc::clone(&self.store);
        let project = self.project.clone();
        let record = tokio::task::spawn_blocking(move || store.prepare(&project, &keys)).await??;
        Ok(record)
    }

    /// Adds `keys` to the current baseline, keeping the baselines of
    /// generations that are still running.
    pub async fn extend_snapshot(&self, keys: Vec<&'static str>) -> anyhow::Result<SnapshotRecord> {
        let store = Arc::clone(&self.store);
        let project = self.project.clone();
        let record = tokio::task::spawn_blocking(move || store.extend(&project, &keys)).await??;
        Ok(record)
    }

    /// Collects the current change set, picking up a snapshot left on disk
    /// by an earlier run when none was captured in this process.
    pub async fn collect_changes(&self) -> anyhow::Result<GenerateChangeSet> {
        let store = Arc::clone(&self.store);
        let project = self.project.clone();
        let set = tokio::task::spawn_blocking(move || {
            store.restore_latest(&project)?;
            collect_generate_changes(&project, all_targets(), &store)
        })
        .await??;
        Ok(set)
    }

    pub async fn render_diff(
        &self,
        change: GenerateFileChange,
        side_by_side: bool,
    ) -> anyhow::Result<RenderedDiff> {
        let store = Arc::clone(&self.store);
        let project = self.project.clone();
        let options = self.config.diff.render_options(side_by_side);
        let rendered = tokio::task::spawn_blocking(move || {
            render_file_diff(&project, &change, &store, options)
        })
        .await??;
        Ok(rendered)
    }
}

/// Resolves target keys, expanding `all` and rejecting unknown keys.
pub fn resolve_targets(keys: &[String]) -> anyhow::Result<Vec<&'static GenerateTargetDefinition>> {
    if keys.iter().any(|key| key == ALL_TARGETS) {
        return Ok(all_targets().iter().collect());
    }
    let mut defs: Vec<&'static GenerateTargetDefinition> = Vec::with_capacity(keys.len());
    for key in keys {
        let def = find_target(key).with_context(|| {
            let known: Vec<&str> = all_targets().iter().map(|t| t.key).collect();
            format!("unknown target '{key}' (known: {}, all)", known.join(", "))
        })?;
        if !defs.iter().any(|seen| seen.key == def.key) {
            defs.push(def);
        }
    }
    Ok(defs)
}

/// Builds the job that regenerates `def`.
pub fn generate_request(
    def: &GenerateTargetDefinition,
    project: &Path,
    config: &GenerateConfig,
) -> anyhow::Result<JobRequest> {
    let (default_program, builtin_args) = def
        .command
        .split_first()
        .with_context(|| format!("target '{}' has no command", def.key))?;
    let mut words = match &config.program {
        Some(program) => shell_words::split(program)
            .with_context(|| format!("invalid generate.program '{program}'"))?,
        None => vec![default_program.to_string()],
    };
    if words.is_empty() {
        anyhow::bail!("generate.program is empty");
    }
    let program = words.remove(0);

    let mut request = JobRequest::new(def.title, program)
        .args(words)
        .args(builtin_args.iter().copied())
        .arg("--project")
        .arg(project.display().to_string())
        .args(config.extra_args.iter().cloned())
        .dir(project);
    for (key, value) in &config.env {
        request = request.env(key.as_str(), value.as_str());
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn builds_default_command() {
        let def = find_target("api").unwrap();
        let request = generate_request(def, Path::new("/work/p"), &GenerateConfig::default()).unwrap();
        assert_eq!(request.title, "API");
        assert_eq!(request.program, "gpt-creator");
        assert_eq!(request.args, vec!["generate", "api", "--project", "/work/p"]);
        assert_eq!(request.dir.as_deref(), Some(Path::new("/work/p")));
        assert!(request.env.is_empty());
    }

    #[test]
    fn configured_program_keeps_its_arguments() {
        let def = find_target("db").unwrap();
        let config = GenerateConfig {
            program: Some("npx 'gpt creator'".to_string()),
            extra_args: vec!["--yes".to_string()],
            env: BTreeMap::from([("CI".to_string(), "1".to_string())]),
        };
        let request = generate_request(def, Path::new("/p"), &config).unwrap();
        assert_eq!(request.program, "npx");
        assert_eq!(
            request.args,
            vec!["gpt creator", "generate", "db", "--project", "/p", "--yes"]
        );
        assert_eq!(request.env, vec![("CI".to_string(), "1".to_string())]);
    }

    #[test]
    fn blank_program_is_rejected() {
        let def = find_target("db").unwrap();
        let config = GenerateConfig {
            program: Some("   ".to_string()),
            ..GenerateConfig::default()
        };
        assert!(generate_request(def, Path::new("/p"), &config).is_err());
    }

    #[test]
    fn resolves_all_and_dedupes() {
        assert_eq!(resolve_targets(&["all".into()]).unwrap().len(), all_targets().len());
        let defs = resolve_targets(&["web".into(), "api".into(), "web".into()]).unwrap();
        let keys: Vec<&str> = defs.iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["web", "api"]);
        let err = resolve_targets(&["mobile".into()]).unwrap_err();
        assert!(err.to_string().contains("unknown target 'mobile'"));
    }
}
