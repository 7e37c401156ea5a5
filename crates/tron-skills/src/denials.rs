//! Tool denial configuration derived from skill frontmatter.
//!
//! A skill restricts tools one of two ways:
//! - **Deny-list** (`deniedTools`): the named tools are denied.
//! - **Allow-list** (`allowedTools`): every available tool not listed is denied.
//!
//! When both are present the deny-list wins. `deniedPatterns` ride along with
//! whichever list applies. Enforcement belongs to the tool runner; this module
//! only computes the data.

use tracing::warn;

use crate::types::{SkillFrontmatter, SkillSubagentMode, ToolDenialConfig};

/// Convert a skill's tool restrictions into a [`ToolDenialConfig`].
///
/// Returns `None` if the skill restricts nothing.
pub fn skill_frontmatter_to_denials(
    frontmatter: &SkillFrontmatter,
    all_available_tools: &[String],
) -> Option<ToolDenialConfig> {
    let denied = frontmatter.denied_tools.as_ref().filter(|d| !d.is_empty());
    let allowed = frontmatter.allowed_tools.as_ref().filter(|a| !a.is_empty());

    let denied_tools = match (denied, allowed) {
        (Some(denied), Some(_)) => {
            warn!("Skill specifies both deniedTools and allowedTools; using deniedTools");
            denied.clone()
        }
        (Some(denied), None) => denied.clone(),
        (None, Some(allowed)) => all_available_tools
            .iter()
            .filter(|tool| !allowed.contains(tool))
            .cloned()
            .collect(),
        (None, None) => return None,
    };

    Some(ToolDenialConfig {
        denied_tools,
        denied_patterns: frontmatter.denied_patterns.clone().unwrap_or_default(),
    })
}

/// Subagent execution mode, [`SkillSubagentMode::No`] when unset.
pub fn get_skill_subagent_mode(frontmatter: &SkillFrontmatter) -> SkillSubagentMode {
    frontmatter.subagent.unwrap_or_default()
}
