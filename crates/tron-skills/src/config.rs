//! Scanner configuration.
//!
//! Directory roots, candidate directory suffixes, the definition filename,
//! and the size ceiling are all carried in [`ScanConfig`] so tests can point
//! the scanner at arbitrary roots.

use std::path::{Path, PathBuf};

use crate::constants::{
    GLOBAL_SKILLS_DIRS, MAX_SKILL_FILE_SIZE, PROJECT_SKILLS_DIRS, SKILL_MD_FILENAME,
};

/// Per-skill load limits shared by every directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLimits {
    /// Name of the definition file inside each skill folder.
    pub definition_file: String,
    /// Maximum definition file size in bytes.
    pub max_file_size: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            definition_file: SKILL_MD_FILENAME.to_string(),
            max_file_size: MAX_SKILL_FILE_SIZE,
        }
    }
}

/// Where and how to look for skills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Root for the global tier (usually the home directory).
    pub global_root: PathBuf,
    /// Root for the project tier (usually the working directory).
    pub project_root: PathBuf,
    /// Global candidate directories relative to `global_root`, in priority order.
    pub global_dirs: Vec<String>,
    /// Project candidate directories relative to `project_root`, in priority order.
    pub project_dirs: Vec<String>,
    /// Load limits.
    pub limits: ScanLimits,
}

impl ScanConfig {
    /// Create a config with default candidate directories and limits.
    pub fn new(global_root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            global_root: global_root.into(),
            project_root: project_root.into(),
            global_dirs: GLOBAL_SKILLS_DIRS.iter().map(ToString::to_string).collect(),
            project_dirs: PROJECT_SKILLS_DIRS.iter().map(ToString::to_string).collect(),
            limits: ScanLimits::default(),
        }
    }

    /// Config rooted at the user's home directory and `working_dir`.
    ///
    /// Falls back to `working_dir` as the global root when no home directory
    /// can be determined.
    pub fn for_working_dir(working_dir: impl AsRef<Path>) -> Self {
        let working_dir = working_dir.as_ref();
        let home = dirs::home_dir().unwrap_or_else(|| working_dir.to_path_buf());
        Self::new(home, working_dir)
    }

    /// Replace the global candidate directories.
    #[must_use]
    pub fn with_global_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the project candidate directories.
    #[must_use]
    pub fn with_project_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Override the size ceiling.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.limits.max_file_size = bytes;
        self
    }

    /// Override the definition filename.
    #[must_use]
    pub fn with_definition_file(mut self, name: impl Into<String>) -> Self {
        self.limits.definition_file = name.into();
        self
    }

    /// Global candidate directories, joined onto the root, in priority order.
    pub fn global_candidates(&self) -> Vec<PathBuf> {
        join_all(&self.global_root, &self.global_dirs)
    }

    /// Project candidate directories, joined onto the root, in priority order.
    pub fn project_candidates(&self) -> Vec<PathBuf> {
        join_all(&self.project_root, &self.project_dirs)
    }
}

fn join_all(root: &Path, dirs: &[String]) -> Vec<PathBuf> {
    dirs.iter().map(|dir| root.join(dir)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_dirs_and_limits() {
        let config = ScanConfig::new("/home/u", "/work/p");
        assert_eq!(config.global_dirs, vec![".tron/skills", ".claude/skills"]);
        assert_eq!(config.project_dirs, vec![".tron/skills", ".claude/skills"]);
        assert_eq!(config.limits.max_file_size, 100 * 1024);
        assert_eq!(config.limits.definition_file, "SKILL.md");
    }

    #[test]
    fn candidates_are_joined_in_order() {
        let config = ScanConfig::new("/home/u", "/work/p");
        let project = config.project_candidates();
        assert_eq!(project[0], PathBuf::from("/work/p/.tron/skills"));
        assert_eq!(project[1], PathBuf::from("/work/p/.claude/skills"));
        let global = config.global_candidates();
        assert_eq!(global[0], PathBuf::from("/home/u/.tron/skills"));
    }

    #[test]
    fn builders_override_fields() {
        let config = ScanConfig::new("/g", "/p")
            .with_global_dirs(["a"])
            .with_project_dirs(["b", "c"])
            .with_max_file_size(10)
            .with_definition_file("SPELL.md");
        assert_eq!(config.global_candidates(), vec![PathBuf::from("/g/a")]);
        assert_eq!(config.project_candidates().len(), 2);
        assert_eq!(config.limits.max_file_size, 10);
        assert_eq!(config.limits.definition_file, "SPELL.md");
    }

    #[test]
    fn for_working_dir_sets_project_root() {
        let config = ScanConfig::for_working_dir("/work/p");
        assert_eq!(config.project_root, PathBuf::from("/work/p"));
    }
}
