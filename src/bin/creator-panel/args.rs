use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "creator-panel",
    version,
    about = "Run project generators under a parallelism limit and review what they changed"
)]
pub struct CliArgs {
    /// Project directory (defaults to the current directory).
    #[arg(long, short = 'p', global = true)]
    pub project: Option<PathBuf>,
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,
    /// Overrides `jobs.max_parallel` from the config file.
    #[arg(long, short = 'j', global = true)]
    pub max_parallel: Option<usize>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Snapshot the targets, run their generators, then report the changes.
    Generate {
        /// Target keys, or `all`.
        #[arg(required = true)]
        targets: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show what changed in the generation targets.
    Changes {
        #[arg(long)]
        json: bool,
    },
    /// Print the diff of one changed file.
    Diff {
        path: String,
        #[arg(long, short = 's')]
        side_by_side: bool,
    },
    /// List the generation targets.
    Targets,
}

impl CliArgs {
    pub fn project_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.project {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_launches_panel() {
        let args = CliArgs::parse_from(["creator-panel", "--project", "/tmp/p", "-j", "3"]);
        assert!(args.command.is_none());
        assert_eq!(args.project, Some(PathBuf::from("/tmp/p")));
        assert_eq!(args.max_parallel, Some(3));
    }

    #[test]
    fn generate_takes_targets_and_global_flags() {
        let args = CliArgs::parse_from(["creator-panel", "generate", "api", "web", "--json", "-j", "1"]);
        assert_eq!(
            args.command,
            Some(Command::Generate {
                targets: vec!["api".into(), "web".into()],
                json: true,
            })
        );
        assert_eq!(args.max_parallel, Some(1));
    }

    #[test]
    fn generate_requires_a_target() {
        assert!(CliArgs::try_parse_from(["creator-panel", "generate"]).is_err());
    }

    #[test]
    fn diff_side_by_side_flag() {
        let args = CliArgs::parse_from(["creator-panel", "diff", "apps/api/main.go", "-s"]);
        assert_eq!(
            args.command,
            Some(Command::Diff {
                path: "apps/api/main.go".into(),
                side_by_side: true,
            })
        );
    }
}
