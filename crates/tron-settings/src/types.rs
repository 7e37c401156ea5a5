//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a partial JSON file only overrides the fields it names.

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "logging": { "level": "debug" },
///   "skills": { "projectDirs": [".tron/skills"] }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TronSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Skill discovery configuration.
    pub skills: SkillsSettings,
}

impl Default for TronSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "tron".to_string(),
            logging: LoggingSettings::default(),
            skills: SkillsSettings::default(),
        }
    }
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level (most verbose).
    Trace,
    /// Debug-level.
    Debug,
    /// Info-level.
    Info,
    /// Warning-level (default).
    #[default]
    Warn,
    /// Error-level (least verbose).
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    pub level: LogLevel,
}

/// Skill discovery configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillsSettings {
    /// Global-tier directories relative to the home directory, in priority order.
    pub global_dirs: Vec<String>,
    /// Project-tier directories relative to the working directory, in priority order.
    pub project_dirs: Vec<String>,
    /// Definition filename inside each skill folder.
    pub definition_file: String,
    /// Maximum definition file size in bytes.
    pub max_file_size: u64,
}

impl Default for SkillsSettings {
    fn default() -> Self {
        Self {
            global_dirs: vec![".tron/skills".to_string(), ".claude/skills".to_string()],
            project_dirs: vec![".tron/skills".to_string(), ".claude/skills".to_string()],
            definition_file: "SKILL.md".to_string(),
            max_file_size: 100 * 1024,
        }
    }
}
