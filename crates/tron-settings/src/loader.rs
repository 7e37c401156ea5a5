//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TronSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{LogLevel, SkillsSettings, TronSettings};

/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "TRON_LOG_LEVEL";
/// Environment variable overriding the skill file size ceiling.
pub const ENV_SKILLS_MAX_FILE_SIZE: &str = "TRON_SKILLS_MAX_FILE_SIZE";
/// Environment variable overriding the skill definition filename.
pub const ENV_SKILLS_DEFINITION_FILE: &str = "TRON_SKILLS_DEFINITION_FILE";

const MIN_SKILL_FILE_SIZE: u64 = 1024;
const MAX_SKILL_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Resolve the path to the settings file (`~/.tron/settings.json`).
pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".tron")
        .join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TronSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TronSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults with the file at `path` merged over them. No env overrides.
///
/// A `skills.definitionFile` that is not a bare filename is reset to the
/// default with a warning.
pub fn load_file_layer(path: &Path) -> Result<TronSettings> {
    let defaults = serde_json::to_value(TronSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TronSettings = serde_json::from_value(merged)?;
    if !is_plain_file_name(&settings.skills.definition_file) {
        warn!(?path, value = %settings.skills.definition_file, "definitionFile must be a bare filename, using default");
        settings.skills.definition_file = SkillsSettings::default().definition_file;
    }
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut TronSettings) {
    apply_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_overrides_with<F>(settings: &mut TronSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(raw) = read(ENV_LOG_LEVEL) {
        match parse_log_level(&raw) {
            Some(level) => settings.logging.level = level,
            None => warn!(key = ENV_LOG_LEVEL, value = %raw, "invalid log level env var, ignoring"),
        }
    }

    if let Some(raw) = read(ENV_SKILLS_MAX_FILE_SIZE) {
        match parse_u64_range(&raw, MIN_SKILL_FILE_SIZE, MAX_SKILL_FILE_SIZE) {
            Some(size) => settings.skills.max_file_size = size,
            None => warn!(key = ENV_SKILLS_MAX_FILE_SIZE, value = %raw, "invalid u64 env var, ignoring"),
        }
    }

    if let Some(name) = read(ENV_SKILLS_DEFINITION_FILE) {
        if is_plain_file_name(&name) {
            settings.skills.definition_file = name;
        } else {
            warn!(key = ENV_SKILLS_DEFINITION_FILE, value = %name, "definition file must be a bare filename, ignoring");
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a log level name (case-insensitive).
pub fn parse_log_level(val: &str) -> Option<LogLevel> {
    serde_json::from_value(Value::String(val.trim().to_lowercase())).ok()
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn is_plain_file_name(name: &str) -> bool {
    let path = Path::new(name);
    path.file_name().is_some_and(|f| f == path.as_os_str())
}
