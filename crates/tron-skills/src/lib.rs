//! # tron-skills
//!
//! Skill discovery, registry, mention detection, context injection, and
//! per-session skill tracking.
//!
//! Skills are `SKILL.md` files with optional YAML frontmatter + markdown body,
//! one per folder. The folder name is the skill's stable name. Skills are
//! discovered from a global tier (under the home directory) and a project tier
//! (under the working directory); project skills shadow global ones.
//!
//! ## Module Overview
//!
//! - [`parser`]: Parse SKILL.md files (YAML frontmatter + markdown body)
//! - [`loader`]: Filesystem discovery, parallel per-directory scanning
//! - [`registry`]: In-memory skill index with command lookup and search
//! - [`mention`]: Trigger-parameterized `@name` / `%name` detection
//! - [`injector`]: Prompt cleanup and `<skills>` XML context building
//! - [`denials`]: Tool denial config from `allowedTools` / `deniedTools`
//! - [`events`]: Session event records consumed by the tracker
//! - [`tracker`]: Per-session active-skill set rebuilt by folding events
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tron_skills::config::ScanConfig;
//! use tron_skills::injector::process_prompt_for_skills;
//! use tron_skills::registry::SkillRegistry;
//!
//! # async fn run() {
//! let config = ScanConfig::for_working_dir("/path/to/project");
//! let registry = SkillRegistry::discover(&config).await;
//!
//! let result = process_prompt_for_skills("Use @browser tool", &registry, &[]);
//! println!("Cleaned: {}", result.cleaned_prompt);
//! println!("Context: {}", result.skill_context);
//! # }
//! ```
//!
//! ## Crate Position
//!
//! Standalone (no tron crate dependencies). Configuration is injected as a
//! [`config::ScanConfig`] value.

#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod denials;
pub mod errors;
pub mod events;
pub mod injector;
pub mod loader;
pub mod mention;
pub mod parser;
pub mod registry;
pub mod tracker;
pub mod types;

pub use config::ScanConfig;
pub use errors::{Result, SkillError};
pub use registry::SkillRegistry;
pub use tracker::SkillTracker;
