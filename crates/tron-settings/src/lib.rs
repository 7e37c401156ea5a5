//! # tron-settings
//!
//! Layered configuration for the Tron skills tooling.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TronSettings::default()`]
//! 2. **User file**: `~/.tron/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TRON_*` overrides (highest priority)
//!
//! There is no global instance. Callers load once and pass the values they
//! need down explicitly.
//!
//! # Usage
//!
//! ```no_run
//! let settings = tron_settings::load_settings().unwrap_or_default();
//! println!("Skill dirs: {:?}", settings.skills.project_dirs);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{LogLevel, LoggingSettings, SkillsSettings, TronSettings};
