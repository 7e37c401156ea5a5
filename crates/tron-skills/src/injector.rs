//! Skill context injection.
//!
//! Resolves `@skill-name` mentions and explicitly selected skills against the
//! registry, strips every completed mention from the prompt, and builds the
//! `<skills>` XML block the model sees ahead of the user's turn.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::events::SkillAddedPayload;
use crate::mention::MentionDetector;
use crate::registry::SkillRegistry;
use crate::tracker::SkillTracker;
use crate::types::{SkillAddMethod, SkillInjectionResult, SkillMetadata, SkillReference};

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Process a user prompt for skill references.
///
/// `selected` are skills the user picked outside the text (e.g. from a
/// popup); they come first, in the given order, followed by mentioned skills
/// in textual order. Skills are deduplicated by canonical name. Every
/// completed mention is removed from the cleaned prompt, resolved or not;
/// names that do not resolve are reported in `not_found_skills`.
pub fn process_prompt_for_skills(
    prompt: &str,
    registry: &SkillRegistry,
    selected: &[String],
) -> SkillInjectionResult {
    let references = MentionDetector::skills().references(prompt);

    let mut injected: Vec<SkillMetadata> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut not_found: Vec<String> = Vec::new();

    for name in selected {
        match registry.resolve(name) {
            Some(skill) => {
                if seen.insert(skill.name.clone()) {
                    injected.push(skill.clone());
                }
            }
            None => note_missing(name, &mut not_found),
        }
    }

    for reference in &references {
        match registry.resolve(&reference.name) {
            Some(skill) => {
                if seen.insert(skill.name.clone()) {
                    injected.push(skill.clone());
                }
            }
            None => note_missing(&reference.name, &mut not_found),
        }
    }

    if !not_found.is_empty() {
        debug!(not_found = ?not_found, "Unresolved skill references");
    }

    let cleaned_prompt = remove_skill_references(prompt, &references);
    let skill_context = build_skill_context(&injected);

    SkillInjectionResult {
        original_prompt: prompt.to_string(),
        cleaned_prompt,
        injected_skills: injected,
        not_found_skills: not_found,
        skill_context,
    }
}

impl SkillInjectionResult {
    /// `skill.added` payloads for injected skills the tracker does not hold yet.
    ///
    /// Emitting these keeps a later replay consistent with what the model
    /// was actually shown.
    pub fn added_events(
        &self,
        tracker: &SkillTracker,
        added_via: SkillAddMethod,
    ) -> Vec<SkillAddedPayload> {
        self.injected_skills
            .iter()
            .filter(|skill| !tracker.has_skill(&skill.name))
            .map(|skill| SkillAddedPayload::for_skill(skill, added_via))
            .collect()
    }
}

fn note_missing(name: &str, not_found: &mut Vec<String>) {
    if !not_found.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        not_found.push(name.to_string());
    }
}

/// Remove `references` from a prompt.
///
/// Collects the kept ranges between references in a single forward pass.
/// Resulting multiple spaces are collapsed.
pub fn remove_skill_references(prompt: &str, references: &[SkillReference]) -> String {
    if references.is_empty() {
        return prompt.to_string();
    }

    let mut sorted_refs: Vec<&SkillReference> = references.iter().collect();
    sorted_refs.sort_by_key(|r| r.position.start);

    let mut result = String::with_capacity(prompt.len());
    let mut cursor = 0;

    for reference in &sorted_refs {
        let span = reference.position;
        if span.start >= cursor && span.end <= prompt.len() {
            result.push_str(&prompt[cursor..span.start]);
            cursor = span.end;
        }
    }
    result.push_str(&prompt[cursor..]);

    MULTI_SPACE.replace_all(&result, " ").trim().to_string()
}

/// Build a `<skills>` XML context block, one `<skill>` per entry in order.
///
/// Returns an empty string if no skills are provided.
pub fn build_skill_context<'a>(skills: impl IntoIterator<Item = &'a SkillMetadata>) -> String {
    let mut skills = skills.into_iter().peekable();
    if skills.peek().is_none() {
        return String::new();
    }

    let mut xml = String::from("<skills>\n");

    for skill in skills {
        let _ = writeln!(xml, "<skill name=\"{}\">", escape_xml(&skill.name));

        if let Some(block) = build_tool_block(skill) {
            xml.push_str(&block);
            xml.push('\n');
        }

        xml.push_str(&skill.content);
        xml.push_str("\n</skill>\n\n");
    }

    xml.push_str("</skills>");
    xml
}

/// Build a message with skill context prepended.
///
/// Returns the original prompt unchanged if no skill context is present.
pub fn build_message_with_skill_context(prompt: &str, skill_context: &str) -> String {
    if skill_context.is_empty() {
        return prompt.to_string();
    }
    format!("{skill_context}\n\n{prompt}")
}

/// Build a `<removed-skills>` notice for skills taken out of the context.
///
/// Returns an empty string when nothing was removed.
pub fn build_removed_skills_notice<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = names
        .into_iter()
        .map(|n| escape_xml(n.as_ref()))
        .collect();
    if names.is_empty() {
        return String::new();
    }
    format!(
        "<removed-skills>\nThe following skills were removed from context: {}. \
         Stop following their instructions.\n</removed-skills>",
        names.join(", ")
    )
}

/// Tool guidance for one skill. An allow-list (or the `tools` hint) becomes
/// a preference; otherwise a deny-list becomes a restriction.
fn build_tool_block(skill: &SkillMetadata) -> Option<String> {
    let fm = &skill.frontmatter;
    let non_empty = |list: &Option<Vec<String>>| list.clone().filter(|l| !l.is_empty());

    if let Some(preferred) = non_empty(&fm.allowed_tools).or_else(|| non_empty(&fm.tools)) {
        let tools = escape_xml(&preferred.join(", "));
        return Some(format!(
            "<skill-tool-preferences>This skill works best with: {tools}. Prefer these tools.</skill-tool-preferences>"
        ));
    }

    let denied = non_empty(&fm.denied_tools)?;
    let tools = escape_xml(&denied.join(", "));
    Some(format!(
        "<skill-tool-restrictions>This skill must NOT use: {tools}. These tools are restricted.</skill-tool-restrictions>"
    ))
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SkillFrontmatter, SkillSource};

    fn make_skill(name: &str, content: &str) -> SkillMetadata {
        SkillMetadata {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            content: content.to_string(),
            frontmatter: SkillFrontmatter::default(),
            source: SkillSource::Global,
            path: String::new(),
            skill_md_path: String::new(),
            additional_files: Vec::new(),
            last_modified: 0,
        }
    }

    fn make_skill_with_tools(name: &str, content: &str, tools: &[&str]) -> SkillMetadata {
        SkillMetadata {
            frontmatter: SkillFrontmatter {
                tools: Some(tools.iter().map(ToString::to_string).collect()),
                ..Default::default()
            },
            ..make_skill(name, content)
        }
    }

    fn registry() -> SkillRegistry {
        let mut registry = SkillRegistry::new();
        registry.register_all([
            make_skill_with_tools("browser", "Browse the web.", &["Read", "Grep"]),
            make_skill("git", "Git ops."),
            make_skill("deploy", "Ship it."),
        ]);
        registry
    }

    fn names(result: &SkillInjectionResult) -> Vec<&str> {
        result
            .injected_skills
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }

    // --- process_prompt_for_skills ---

    #[test]
    fn test_process_no_references() {
        let result = process_prompt_for_skills("Plain  text", &registry(), &[]);
        assert_eq!(result.cleaned_prompt, "Plain  text");
        assert!(result.injected_skills.is_empty());
        assert!(result.skill_context.is_empty());
    }

    #[test]
    fn test_process_resolves_and_cleans() {
        let result = process_prompt_for_skills("Use @browser for browsing", &registry(), &[]);
        assert_eq!(result.original_prompt, "Use @browser for browsing");
        assert_eq!(result.cleaned_prompt, "Use for browsing");
        assert_eq!(names(&result), vec!["browser"]);
        assert!(result.skill_context.contains("<skill name=\"browser\">"));
    }

    #[test]
    fn test_process_dedupes_and_keeps_textual_order() {
        let result =
            process_prompt_for_skills("@git then @deploy then @GIT again", &registry(), &[]);
        assert_eq!(names(&result), vec!["git", "deploy"]);
        assert_eq!(result.cleaned_prompt, "then then again");
    }

    #[test]
    fn test_process_selected_first() {
        let selected = vec!["deploy".to_string()];
        let result = process_prompt_for_skills("use @git and @deploy", &registry(), &selected);
        assert_eq!(names(&result), vec!["deploy", "git"]);
        let deploy = result.skill_context.find("name=\"deploy\"").unwrap();
        let git = result.skill_context.find("name=\"git\"").unwrap();
        assert!(deploy < git);
    }

    #[test]
    fn test_process_removes_unresolved_mentions() {
        let result = process_prompt_for_skills("use @git and @missing now", &registry(), &[]);
        assert_eq!(names(&result), vec!["git"]);
        assert_eq!(result.not_found_skills, vec!["missing"]);
        assert_eq!(result.cleaned_prompt, "use and now");
    }

    #[test]
    fn test_process_reports_missing_selection_once() {
        let selected = vec!["ghost".to_string()];
        let result =
            process_prompt_for_skills("@Ghost and @missing @missing", &registry(), &selected);
        assert!(result.injected_skills.is_empty());
        assert!(result.skill_context.is_empty());
        assert_eq!(result.not_found_skills, vec!["ghost", "missing"]);
        assert_eq!(result.cleaned_prompt, "and");
    }

    #[test]
    fn test_process_ignores_code_and_email() {
        let prompt = "mail user@example.com, run `@git` then\n```\n@deploy\n```";
        let result = process_prompt_for_skills(prompt, &registry(), &[]);
        assert!(result.injected_skills.is_empty());
        assert!(result.not_found_skills.is_empty());
        assert_eq!(result.cleaned_prompt, prompt);
    }

    #[test]
    fn test_added_events_skip_tracked() {
        let result = process_prompt_for_skills("@git @deploy", &registry(), &[]);
        let mut tracker = SkillTracker::new();
        tracker.add_skill(
            "git".to_string(),
            SkillSource::Global,
            SkillAddMethod::Mention,
            None,
        );

        let events = result.added_events(&tracker, SkillAddMethod::Mention);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].skill_name, "deploy");
        assert_eq!(events[0].added_via, SkillAddMethod::Mention);
    }

    // --- remove_skill_references ---

    #[test]
    fn test_remove_no_references() {
        assert_eq!(remove_skill_references("No changes", &[]), "No changes");
    }

    #[test]
    fn test_remove_adjacent_references() {
        let prompt = "Run @browser @git now";
        let refs = MentionDetector::skills().references(prompt);
        assert_eq!(refs.len(), 2);
        assert_eq!(remove_skill_references(prompt, &refs), "Run now");
    }

    #[test]
    fn test_remove_trailing_reference() {
        let prompt = "Use @browser and @git";
        let refs = MentionDetector::skills().references(prompt);
        assert_eq!(remove_skill_references(prompt, &refs), "Use and");
    }

    // --- build_skill_context ---

    #[test]
    fn test_build_empty_context() {
        assert!(build_skill_context(&[] as &[SkillMetadata]).is_empty());
    }

    #[test]
    fn test_build_context_snapshot() {
        let browser = make_skill_with_tools("browser", "Browse the web.", &["Read", "Grep"]);
        let git = make_skill("git", "Git ops.");
        let context = build_skill_context([&browser, &git]);
        insta::assert_snapshot!(context, @r#"
        <skills>
        <skill name="browser">
        <skill-tool-preferences>This skill works best with: Read, Grep. Prefer these tools.</skill-tool-preferences>
        Browse the web.
        </skill>

        <skill name="git">
        Git ops.
        </skill>

        </skills>
        "#);
    }

    #[test]
    fn test_build_context_without_tools() {
        let skill = make_skill_with_tools("plain", "Body.", &[]);
        let context = build_skill_context([&skill]);
        assert!(!context.contains("<skill-tool-preferences>"));
    }

    #[test]
    fn test_build_context_restrictions() {
        let skill = SkillMetadata {
            frontmatter: SkillFrontmatter {
                denied_tools: Some(vec!["Bash".into(), "Write".into()]),
                ..Default::default()
            },
            ..make_skill("readonly", "Look, do not touch.")
        };
        insta::assert_snapshot!(build_skill_context([&skill]), @r#"
        <skills>
        <skill name="readonly">
        <skill-tool-restrictions>This skill must NOT use: Bash, Write. These tools are restricted.</skill-tool-restrictions>
        Look, do not touch.
        </skill>

        </skills>
        "#);
    }

    #[test]
    fn test_build_context_allowed_tools_take_precedence() {
        let skill = SkillMetadata {
            frontmatter: SkillFrontmatter {
                allowed_tools: Some(vec!["Read".into()]),
                denied_tools: Some(vec!["Bash".into()]),
                ..Default::default()
            },
            ..make_skill("reader", "Read only.")
        };
        let context = build_skill_context([&skill]);
        assert!(context.contains("This skill works best with: Read."));
        assert!(!context.contains("<skill-tool-restrictions>"));
    }

    #[test]
    fn test_build_context_escapes_xml() {
        let skill = make_skill("test&<>", "Content");
        let context = build_skill_context([&skill]);
        assert!(context.contains("test&amp;&lt;&gt;"));
    }

    // --- build_message_with_skill_context ---

    #[test]
    fn test_build_message_no_context() {
        assert_eq!(build_message_with_skill_context("Hello", ""), "Hello");
    }

    #[test]
    fn test_build_message_with_context() {
        let result = build_message_with_skill_context("Hello", "<skills>data</skills>");
        assert_eq!(result, "<skills>data</skills>\n\nHello");
    }

    // --- build_removed_skills_notice ---

    #[test]
    fn test_removed_notice_empty() {
        assert!(build_removed_skills_notice(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_removed_notice_lists_names() {
        let notice = build_removed_skills_notice(["browser", "git"]);
        assert!(notice.starts_with("<removed-skills>"));
        assert!(notice.contains("browser, git"));
        assert!(notice.ends_with("</removed-skills>"));
    }

    #[test]
    fn test_removed_notice_from_tracker() {
        let mut tracker = SkillTracker::new();
        tracker.add_skill(
            "git".to_string(),
            SkillSource::Project,
            SkillAddMethod::Explicit,
            None,
        );
        assert!(tracker.remove_skill("git"));
        let notice = build_removed_skills_notice(tracker.removed_skill_names());
        assert!(notice.contains("git"));
    }

    // --- escape_xml ---

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a&b"), "a&amp;b");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }
}
