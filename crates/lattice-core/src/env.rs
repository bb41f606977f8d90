//! `RuntimeEnv` — localizes implicit process-wide state (date, platform,
//! working directory, available sub-agents, folder tree) behind one
//! collaborator so callers — and tests — can pin it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

/// A pinned view of process-wide environment facts, injected into the system
/// prompt template.
#[derive(Debug, Clone)]
pub struct RuntimeEnv {
    now: DateTime<Utc>,
    platform: String,
    cwd: PathBuf,
    available_agents: Vec<String>,
}

/// Default cap on the number of entries rendered in the bounded folder tree.
pub const DEFAULT_FOLDER_TREE_LIMIT: usize = 200;

impl RuntimeEnv {
    /// Build a `RuntimeEnv` from the live process (current time, platform,
    /// working directory). Prefer [`RuntimeEnv::pinned`] in tests.
    #[must_use]
    pub fn current(cwd: PathBuf, available_agents: Vec<String>) -> Self {
        Self {
            now: Utc::now(),
            platform: std::env::consts::OS.to_string(),
            cwd,
            available_agents,
        }
    }

    /// Build a `RuntimeEnv` with every field pinned to a fixed value, for
    /// deterministic tests.
    #[must_use]
    pub fn pinned(
        now: DateTime<Utc>,
        platform: impl Into<String>,
        cwd: PathBuf,
        available_agents: Vec<String>,
    ) -> Self {
        Self {
            now,
            platform: platform.into(),
            cwd,
            available_agents,
        }
    }

    /// The pinned timestamp.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// The pinned platform string (e.g. `"linux"`).
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// The working directory.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Sub-agent ids available for delegation (`assign_task`).
    #[must_use]
    pub fn available_agents(&self) -> &[String] {
        &self.available_agents
    }

    /// Render a bounded folder tree rooted at `cwd`, capped at `limit`
    /// entries, for inclusion in the system prompt template.
    #[must_use]
    pub fn bounded_folder_tree(&self, limit: usize) -> Vec<String> {
        WalkDir::new(&self.cwd)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .take(limit)
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.cwd)
                    .ok()
                    .map(|p| p.display().to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pinned_env_is_deterministic() {
        let env = RuntimeEnv::pinned(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            "linux",
            PathBuf::from("/tmp/project"),
            vec!["researcher".into()],
        );
        assert_eq!(env.platform(), "linux");
        assert_eq!(env.available_agents(), &["researcher".to_string()]);
    }

    #[test]
    fn bounded_folder_tree_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            std::fs::write(dir.path().join(format!("f{i}.txt")), "x").unwrap();
        }
        let env = RuntimeEnv::pinned(Utc::now(), "linux", dir.path().to_path_buf(), vec![]);
        let tree = env.bounded_folder_tree(3);
        assert_eq!(tree.len(), 3);
    }
}
