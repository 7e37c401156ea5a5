//! Error types for skill loading.
//!
//! [`SkillError`] describes why a single skill definition could not be
//! loaded. The scanner never propagates it: each error is converted into a
//! [`SkillScanError`](crate::types::SkillScanError) record scoped to one
//! skill folder or one directory.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a skill definition.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Filesystem error reading the definition or its metadata.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Definition file exceeds the configured size ceiling.
    #[error("file too large: {size} bytes (max {max} bytes)")]
    FileTooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        max: u64,
    },

    /// Definition file is not valid UTF-8.
    #[error("file is not valid UTF-8: {}", path.display())]
    NotUtf8 {
        /// Offending file.
        path: PathBuf,
    },

    /// Frontmatter header is neither YAML nor readable `key: value` lines.
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    /// Folder name cannot be used as a skill name.
    #[error("folder name is not valid UTF-8: {}", path.display())]
    InvalidName {
        /// Offending folder.
        path: PathBuf,
    },
}

/// Convenience type alias for skill loading results.
pub type Result<T> = std::result::Result<T, SkillError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
