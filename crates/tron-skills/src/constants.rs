//! Shared constants for the skills system.
//!
//! These are defaults only. The scanner reads its limits and directories from
//! [`ScanConfig`](crate::config::ScanConfig).

/// Maximum allowed file size for SKILL.md files (100 KiB).
pub const MAX_SKILL_FILE_SIZE: u64 = 100 * 1024;

/// Expected filename for skill definitions.
pub const SKILL_MD_FILENAME: &str = "SKILL.md";

/// Global skills directories (relative to home), primary first.
pub const GLOBAL_SKILLS_DIRS: &[&str] = &[".tron/skills", ".claude/skills"];

/// Project skills directories (relative to project root), primary first.
pub const PROJECT_SKILLS_DIRS: &[&str] = &[".tron/skills", ".claude/skills"];

/// Maximum length (bytes) of a description derived from the body.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Trigger character for skill mentions.
pub const SKILL_TRIGGER: char = '@';

/// Trigger character for ephemeral spell mentions.
pub const SPELL_TRIGGER: char = '%';
