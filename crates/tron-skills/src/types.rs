//! Core types for the skills system.
//!
//! All wire-facing types use `camelCase` serde renaming for compatibility
//! with the iOS client and the session event log.

use serde::{Deserialize, Serialize};

/// Where a skill was loaded from.
///
/// Project skills take precedence over global skills at registration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    /// Loaded from a directory under the home directory.
    #[default]
    Global,
    /// Loaded from a directory under the working directory.
    Project,
}

impl std::fmt::Display for SkillSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// How a skill was added to a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillAddMethod {
    /// Added via `@skill-name` mention in user prompt.
    #[default]
    Mention,
    /// Added explicitly (e.g., picked from the skill sheet).
    Explicit,
    /// Added because its frontmatter sets `autoInject: true`.
    AutoInject,
}

impl std::fmt::Display for SkillAddMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mention => write!(f, "mention"),
            Self::Explicit => write!(f, "explicit"),
            Self::AutoInject => write!(f, "autoInject"),
        }
    }
}

/// Why a skill was removed from a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillRemoveReason {
    /// Removed manually by user.
    #[default]
    Manual,
    /// Removed by context clear.
    Clear,
    /// Removed by compaction.
    Compact,
}

/// How a skill runs when delegated to a subagent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSubagentMode {
    /// Run inline (default).
    #[default]
    No,
    /// Ask the user before spawning a subagent.
    Ask,
    /// Always run in a subagent.
    Yes,
}

/// Value type of a skill argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillArgumentType {
    /// Free text (default).
    #[default]
    String,
    /// Numeric value.
    Number,
    /// `true` / `false`.
    Boolean,
    /// List of values.
    Array,
}

/// One declared argument of a command-style skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillArgument {
    /// Argument name.
    pub name: String,
    /// What the argument controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value type.
    #[serde(default, rename = "type")]
    pub arg_type: SkillArgumentType,
    /// Whether the argument must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Default value when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Allowed values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<serde_json::Value>>,
}

/// Example invocation of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillExample {
    /// Invocation text.
    pub command: String,
    /// What the example does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Pattern-based denial for one tool's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDeniedPatternRule {
    /// Tool the rule applies to.
    pub tool: String,
    /// Parameter patterns to deny.
    #[serde(default)]
    pub deny_patterns: Vec<DenyPattern>,
    /// Message shown when the rule fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Regex patterns denied for one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenyPattern {
    /// Parameter name.
    pub parameter: String,
    /// Regex patterns that trigger denial.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// YAML frontmatter parsed from a SKILL.md file.
///
/// Every field is optional; unknown keys are ignored by the parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillFrontmatter {
    /// Human-readable name (becomes the display name, never the key).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Slash-style command alias, distinct from the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Semantic version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Categorization tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Declared arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<SkillArgument>>,
    /// Names of skills this one builds on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    /// Example invocations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<SkillExample>>,
    /// Inject into every prompt without a mention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_inject: Option<bool>,
    /// Tools this skill works best with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    /// Allow-list of tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Deny-list of tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_tools: Option<Vec<String>>,
    /// Pattern-based deny rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_patterns: Option<Vec<SkillDeniedPatternRule>>,
    /// Subagent execution mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subagent: Option<SkillSubagentMode>,
    /// Model override for subagent execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subagent_model: Option<String>,
}

/// Full metadata for a loaded skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMetadata {
    /// Folder name (used as `@reference`). Never taken from frontmatter.
    pub name: String,
    /// Human-readable display name (from frontmatter or folder name).
    pub display_name: String,
    /// Short description (frontmatter, else first content line of the body).
    pub description: String,
    /// Full SKILL.md content after frontmatter stripped.
    pub content: String,
    /// Parsed frontmatter.
    pub frontmatter: SkillFrontmatter,
    /// Where this skill was loaded from.
    pub source: SkillSource,
    /// Absolute path to skill folder.
    pub path: String,
    /// Absolute path to SKILL.md file.
    pub skill_md_path: String,
    /// Additional files in the skill folder, relative to it.
    pub additional_files: Vec<String>,
    /// Last modification time (milliseconds since epoch).
    pub last_modified: u64,
}

impl SkillMetadata {
    /// Command alias from frontmatter, if any.
    pub fn command(&self) -> Option<&str> {
        self.frontmatter.command.as_deref().filter(|c| !c.is_empty())
    }

    /// Whether this skill is injected without an explicit mention.
    pub fn auto_inject(&self) -> bool {
        self.frontmatter.auto_inject.unwrap_or(false)
    }
}

/// Tool denial configuration derived from skill frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDenialConfig {
    /// Tools that are denied outright.
    pub denied_tools: Vec<String>,
    /// Pattern-based deny rules.
    pub denied_patterns: Vec<SkillDeniedPatternRule>,
}

/// Lightweight skill info (excludes full content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInfo {
    /// Folder name.
    pub name: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Short description.
    pub description: String,
    /// Source location.
    pub source: SkillSource,
    /// Command alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Tags from frontmatter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl From<&SkillMetadata> for SkillInfo {
    fn from(meta: &SkillMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            display_name: meta.display_name.clone(),
            description: meta.description.clone(),
            source: meta.source,
            command: meta.frontmatter.command.clone(),
            tags: meta.frontmatter.tags.clone(),
        }
    }
}

/// Byte span of a mention inside the raw text (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    /// Start offset of the trigger character.
    pub start: usize,
    /// End offset after the last name character.
    pub end: usize,
}

/// A trigger-prefixed reference found in user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillReference {
    /// Original text as typed (e.g., `@browser`).
    pub original: String,
    /// Extracted name as typed (e.g., `browser`).
    pub name: String,
    /// Location in the original string.
    pub position: TextPosition,
}

/// Result of processing a prompt for skill injection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInjectionResult {
    /// Original user prompt.
    pub original_prompt: String,
    /// Prompt with every completed reference removed.
    pub cleaned_prompt: String,
    /// Resolved skills in selection order, deduplicated by name.
    pub injected_skills: Vec<SkillMetadata>,
    /// Names referenced but not found.
    pub not_found_skills: Vec<String>,
    /// Generated `<skills>` XML context block.
    pub skill_context: String,
}

/// Result of scanning one or more skills directories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillScanResult {
    /// Skills found.
    pub skills: Vec<SkillMetadata>,
    /// Errors encountered during scanning.
    pub errors: Vec<SkillScanError>,
}

/// Error encountered while scanning/loading a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScanError {
    /// Path to the problematic skill folder or directory.
    pub path: String,
    /// Error message.
    pub message: String,
    /// `true` when only one skill was skipped; `false` when a whole
    /// directory could not be enumerated.
    pub recoverable: bool,
}

/// Snapshot of one skill in a session's active context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedSkillInfo {
    /// Skill name.
    pub name: String,
    /// Source location.
    pub source: SkillSource,
    /// How it was added.
    pub added_via: SkillAddMethod,
    /// Event ID (for removal tracking).
    pub event_id: Option<String>,
    /// Estimated token count (from content length).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
}
