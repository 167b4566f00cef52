//! The fixed table of generation targets.

use serde::Serialize;

/// A generation target: the command that produces it and the project paths
/// it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerateTargetDefinition {
    pub key: &'static str,
    pub title: &'static str,
    pub command: &'static [&'static str],
    pub dirs: &'static [&'static str],
    pub files: &'static [&'static str],
}

const TARGETS: &[GenerateTargetDefinition] = &[
    GenerateTargetDefinition {
        key: "api",
        title: "API",
        command: &["gpt-creator", "generate", "api"],
        dirs: &["apps/api"],
        files: &[],
    },
    GenerateTargetDefinition {
        key: "web",
        title: "Web",
        command: &["gpt-creator", "generate", "web"],
        dirs: &["apps/web"],
        files: &[],
    },
    GenerateTargetDefinition {
        key: "admin",
        title: "Admin",
        command: &["gpt-creator", "generate", "admin"],
        dirs: &["apps/admin"],
        files: &[],
    },
    GenerateTargetDefinition {
        key: "db",
        title: "Database",
        command: &["gpt-creator", "generate", "db"],
        dirs: &["db"],
        files: &[],
    },
    GenerateTargetDefinition {
        key: "docker",
        title: "Docker",
        command: &["gpt-creator", "generate", "docker"],
        dirs: &["docker"],
        files: &["docker-compose.yml", ".dockerignore"],
    },
];

/// All targets in declaration order.
pub fn all_targets() -> &'static [GenerateTargetDefinition] {
    TARGETS
}

pub fn find_target(key: &str) -> Option<&'static GenerateTargetDefinition> {
    TARGETS.iter().find(|target| target.key == key)
}

/// First target in `targets` that owns `path`.
pub fn target_for_path<'a>(
    targets: &'a [GenerateTargetDefinition],
    path: &str,
) -> Option<&'a GenerateTargetDefinition> {
    targets.iter().find(|target| target.owns(path))
}

impl GenerateTargetDefinition {
    /// True when `path` (relative, `/` separated) equals or sits under one of
    /// the target's directories, or equals one of its files.
    pub fn owns(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        self.dirs.iter().any(|dir| {
            path == *dir
                || path
                    .strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
        }) || self.files.iter().any(|file| path == *file)
    }

    /// Every project-relative path the target owns.
    pub fn paths(&self) -> impl Iterator<Item = &'static str> {
        self.dirs.iter().chain(self.files.iter()).copied()
    }
}
