//! In-memory skill registry.
//!
//! Maintains a `HashMap` of skills keyed by name plus a secondary index from
//! command alias to name. Registration is last-write-wins: callers register
//! the global tier first and the project tier second, which is where project
//! skills come to shadow global skills with the same name.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::loader;
use crate::types::{SkillInfo, SkillMetadata, SkillScanResult, SkillSource};

/// In-memory registry of available skills.
#[derive(Debug, Default)]
pub struct SkillRegistry {
    skills: HashMap<String, SkillMetadata>,
    commands: HashMap<String, String>,
}

/// Match tier used to rank search results (lower is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    ExactName,
    NamePrefix,
    NameContains,
    DescriptionOrTag,
}

impl SkillRegistry {
    /// Create a new empty skill registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the two tier scan results.
    ///
    /// Global skills are registered first and project skills second, so a
    /// project skill replaces a global skill with the same name.
    pub fn from_scan(global: SkillScanResult, project: SkillScanResult) -> Self {
        let mut registry = Self::new();
        registry.load_scan(global, project);
        registry
    }

    /// Scan both tiers described by `config` and build a registry.
    pub async fn discover(config: &ScanConfig) -> Self {
        let (global, project) = loader::scan_all(config).await;
        Self::from_scan(global, project)
    }

    /// Drop every skill and rescan.
    pub async fn refresh(&mut self, config: &ScanConfig) {
        let (global, project) = loader::scan_all(config).await;
        self.skills.clear();
        self.commands.clear();
        self.load_scan(global, project);
    }

    fn load_scan(&mut self, global: SkillScanResult, project: SkillScanResult) {
        for error in &global.errors {
            warn!(path = %error.path, message = %error.message, recoverable = error.recoverable, "Global skill scan error");
        }
        for error in &project.errors {
            warn!(path = %error.path, message = %error.message, recoverable = error.recoverable, "Project skill scan error");
        }

        self.register_all(global.skills);
        for skill in project.skills {
            if let Some(shadowed) = self.skills.get(&skill.name) {
                debug!(name = %skill.name, shadowed = %shadowed.path, "Project skill shadows global skill");
            }
            self.register(skill);
        }

        debug!(count = self.skills.len(), "Skill registry loaded");
    }

    /// Get a skill by its exact name.
    pub fn get(&self, name: &str) -> Option<&SkillMetadata> {
        self.skills.get(name)
    }

    /// Get a skill by name, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> Option<&SkillMetadata> {
        self.skills.get(name).or_else(|| {
            self.skills
                .values()
                .filter(|s| s.name.eq_ignore_ascii_case(name))
                .min_by(|a, b| a.name.cmp(&b.name))
        })
    }

    /// Check if a skill exists.
    pub fn has(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    /// Get a skill by its frontmatter `command`.
    pub fn get_by_command(&self, command: &str) -> Option<&SkillMetadata> {
        self.commands
            .get(command)
            .and_then(|name| self.skills.get(name))
    }

    /// Check if a command alias is registered.
    pub fn has_command(&self, command: &str) -> bool {
        self.get_by_command(command).is_some()
    }

    /// All registered command aliases, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    /// All skills, sorted alphabetically by name.
    pub fn list(&self) -> Vec<&SkillMetadata> {
        let mut skills: Vec<&SkillMetadata> = self.skills.values().collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    /// List skills as lightweight `SkillInfo`, optionally filtered by source.
    ///
    /// Results are sorted alphabetically by name.
    pub fn list_info(&self, source: Option<SkillSource>) -> Vec<SkillInfo> {
        self.list()
            .into_iter()
            .filter(|s| source.is_none_or(|src| s.source == src))
            .map(SkillInfo::from)
            .collect()
    }

    /// Skills whose frontmatter sets `autoInject: true`, sorted by name.
    pub fn auto_inject(&self) -> Vec<&SkillMetadata> {
        self.list().into_iter().filter(|s| s.auto_inject()).collect()
    }

    /// Get multiple skills by name (case-insensitive).
    ///
    /// Returns `(found, not_found)`, each in input order.
    pub fn get_many(&self, names: &[&str]) -> (Vec<&SkillMetadata>, Vec<String>) {
        let mut found = Vec::new();
        let mut not_found = Vec::new();

        for name in names {
            match self.resolve(name) {
                Some(skill) => found.push(skill),
                None => not_found.push((*name).to_string()),
            }
        }

        (found, not_found)
    }

    /// Register a skill, replacing any existing skill with the same name.
    ///
    /// A `command` alias shadows any earlier mapping for the same command.
    pub fn register(&mut self, skill: SkillMetadata) {
        let name = skill.name.clone();
        if let Some(previous) = self.skills.remove(&name) {
            self.drop_command_of(&previous);
        }
        if let Some(command) = skill.command() {
            if let Some(owner) = self.commands.insert(command.to_string(), name.clone()) {
                if owner != name {
                    debug!(command, previous = %owner, name = %name, "Command mapping shadowed");
                }
            }
        }
        let _ = self.skills.insert(name, skill);
    }

    /// Register every skill in order.
    pub fn register_all(&mut self, skills: impl IntoIterator<Item = SkillMetadata>) {
        for skill in skills {
            self.register(skill);
        }
    }

    /// Remove a skill by name. Returns the removed skill, if any.
    pub fn unregister(&mut self, name: &str) -> Option<SkillMetadata> {
        let removed = self.skills.remove(name)?;
        self.drop_command_of(&removed);
        Some(removed)
    }

    /// Remove the command mapping of `skill` if it still points at it.
    fn drop_command_of(&mut self, skill: &SkillMetadata) {
        if let Some(command) = skill.command() {
            if self.commands.get(command) == Some(&skill.name) {
                let _ = self.commands.remove(command);
            }
        }
    }

    /// Case-insensitive substring search over name, description, and tags.
    ///
    /// Exact and prefix name matches rank first, then other name matches,
    /// then description/tag-only matches; ties go to the shorter name.
    pub fn search(&self, query: &str) -> Vec<&SkillMetadata> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.list();
        }

        let mut ranked: Vec<(MatchRank, &SkillMetadata)> = self
            .skills
            .values()
            .filter_map(|skill| rank_match(skill, &query).map(|rank| (rank, skill)))
            .collect();

        ranked.sort_by(|(rank_a, a), (rank_b, b)| {
            rank_a
                .cmp(rank_b)
                .then_with(|| a.name.len().cmp(&b.name.len()))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.into_iter().map(|(_, skill)| skill).collect()
    }

    /// Get the total number of skills.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the registry holds no skills.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

fn rank_match(skill: &SkillMetadata, query: &str) -> Option<MatchRank> {
    let name = skill.name.to_lowercase();
    if name == query {
        return Some(MatchRank::ExactName);
    }
    if name.starts_with(query) {
        return Some(MatchRank::NamePrefix);
    }
    if name.contains(query) {
        return Some(MatchRank::NameContains);
    }

    let in_description = skill.description.to_lowercase().contains(query);
    let in_tags = skill
        .frontmatter
        .tags
        .iter()
        .flatten()
        .any(|tag| tag.to_lowercase().contains(query));
    (in_description || in_tags).then_some(MatchRank::DescriptionOrTag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkillFrontmatter;

    fn make_skill(name: &str, display_name: &str, source: SkillSource) -> SkillMetadata {
        SkillMetadata {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: format!("{display_name} skill"),
            content: format!("{display_name} content"),
            frontmatter: SkillFrontmatter::default(),
            source,
            path: format!("/{source}/{name}"),
            skill_md_path: String::new(),
            additional_files: Vec::new(),
            last_modified: 0,
        }
    }

    fn with_command(mut skill: SkillMetadata, command: &str) -> SkillMetadata {
        skill.frontmatter.command = Some(command.to_string());
        skill
    }

    fn make_registry_with_skills() -> SkillRegistry {
        let mut registry = SkillRegistry::new();
        registry.register(make_skill("alpha", "Alpha", SkillSource::Global));
        registry.register(make_skill("beta", "Beta", SkillSource::Global));
        registry
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = SkillRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_get() {
        let registry = make_registry_with_skills();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("alpha").unwrap().display_name, "Alpha");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = make_registry_with_skills();
        assert_eq!(registry.resolve("ALPHA").unwrap().name, "alpha");
        assert!(registry.get("ALPHA").is_none());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let mut registry = make_registry_with_skills();
        registry.register(make_skill("aardvark", "A", SkillSource::Project));
        let names: Vec<&str> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["aardvark", "alpha", "beta"]);
    }

    #[test]
    fn test_list_info_filtered_by_source() {
        let mut registry = SkillRegistry::new();
        registry.register(make_skill("global-only", "GO", SkillSource::Global));
        registry.register(make_skill("project-only", "PO", SkillSource::Project));

        let global = registry.list_info(Some(SkillSource::Global));
        let project = registry.list_info(Some(SkillSource::Project));
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].name, "global-only");
        assert_eq!(project[0].name, "project-only");
        assert_eq!(registry.list_info(None).len(), 2);
    }

    #[test]
    fn test_get_many() {
        let registry = make_registry_with_skills();
        let (found, not_found) = registry.get_many(&["Alpha", "nonexistent"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "alpha");
        assert_eq!(not_found, vec!["nonexistent"]);
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = SkillRegistry::new();
        registry.register(make_skill("a", "First", SkillSource::Global));
        registry.register(make_skill("a", "Second", SkillSource::Project));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().display_name, "Second");
    }

    #[test]
    fn test_project_tier_overrides_global_tier() {
        let global = SkillScanResult {
            skills: vec![make_skill("deploy", "Global Deploy", SkillSource::Global)],
            errors: Vec::new(),
        };
        let project = SkillScanResult {
            skills: vec![make_skill("deploy", "Project Deploy", SkillSource::Project)],
            errors: Vec::new(),
        };

        let registry = SkillRegistry::from_scan(global, project);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("deploy").unwrap().source, SkillSource::Project);
    }

    #[test]
    fn test_unregister() {
        let mut registry = make_registry_with_skills();
        assert_eq!(registry.unregister("alpha").unwrap().name, "alpha");
        assert!(!registry.has("alpha"));
        assert!(registry.unregister("alpha").is_none());
        assert!(registry.unregister("never-there").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_command_lookup() {
        let mut registry = SkillRegistry::new();
        registry.register(with_command(
            make_skill("deploy", "Deploy", SkillSource::Global),
            "ship",
        ));

        assert_eq!(registry.get_by_command("ship").unwrap().name, "deploy");
        assert!(registry.has_command("ship"));
        assert!(!registry.has_command("deploy"));
        assert_eq!(registry.commands(), vec!["ship"]);
    }

    #[test]
    fn test_duplicate_command_shadows_earlier_mapping() {
        let mut registry = SkillRegistry::new();
        registry.register(with_command(make_skill("a", "A", SkillSource::Global), "go"));
        registry.register(with_command(make_skill("b", "B", SkillSource::Global), "go"));

        assert_eq!(registry.get_by_command("go").unwrap().name, "b");
        assert_eq!(registry.len(), 2);

        // Removing the shadowed skill leaves the newer mapping intact.
        let _ = registry.unregister("a");
        assert_eq!(registry.get_by_command("go").unwrap().name, "b");

        let _ = registry.unregister("b");
        assert!(!registry.has_command("go"));
    }

    #[test]
    fn test_replacing_skill_drops_stale_command() {
        let mut registry = SkillRegistry::new();
        registry.register(with_command(make_skill("a", "A", SkillSource::Global), "old"));
        registry.register(with_command(make_skill("a", "A", SkillSource::Project), "new"));

        assert!(!registry.has_command("old"));
        assert_eq!(registry.get_by_command("new").unwrap().source, SkillSource::Project);
    }

    #[test]
    fn test_search_ranking() {
        let mut registry = SkillRegistry::new();
        registry.register(make_skill("git", "Git", SkillSource::Global));
        registry.register(make_skill("github-pr", "PR", SkillSource::Global));
        registry.register(make_skill("gitlab", "Lab", SkillSource::Global));
        registry.register(make_skill("legit", "Legit", SkillSource::Global));
        let mut tagged = make_skill("release", "Release", SkillSource::Global);
        tagged.frontmatter.tags = Some(vec!["Git".to_string()]);
        registry.register(tagged);
        registry.register(make_skill("browser", "Browser", SkillSource::Global));

        let names: Vec<&str> = registry.search("GIT").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["git", "gitlab", "github-pr", "legit", "release"]);
    }

    #[test]
    fn test_search_matches_description() {
        let mut registry = SkillRegistry::new();
        let mut skill = make_skill("web", "Web", SkillSource::Global);
        skill.description = "Browse websites".to_string();
        registry.register(skill);

        assert_eq!(registry.search("websites").len(), 1);
        assert!(registry.search("nothing-like-this").is_empty());
    }

    #[test]
    fn test_search_empty_query_lists_all() {
        let registry = make_registry_with_skills();
        assert_eq!(registry.search("  ").len(), 2);
    }

    #[test]
    fn test_auto_inject() {
        let mut registry = make_registry_with_skills();
        let mut always = make_skill("style", "Style", SkillSource::Project);
        always.frontmatter.auto_inject = Some(true);
        registry.register(always);

        let names: Vec<&str> = registry.auto_inject().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["style"]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_registry_wholesale() {
        let home = tempfile::TempDir::new().unwrap();
        let project = tempfile::TempDir::new().unwrap();
        let skills_dir = project.path().join(".tron/skills");
        let write_skill = |name: &str, body: &str| {
            let dir = skills_dir.join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("SKILL.md"), body).unwrap();
        };
        write_skill("old", "---\ncommand: legacy\n---\nOld.");
        write_skill("kept", "Kept.");

        let config = ScanConfig::new(home.path(), project.path());
        let mut registry = SkillRegistry::discover(&config).await;
        assert!(registry.has("old"));
        assert!(registry.has_command("legacy"));

        std::fs::remove_dir_all(skills_dir.join("old")).unwrap();
        write_skill("new", "New.");
        registry.refresh(&config).await;

        assert!(!registry.has("old"));
        assert!(!registry.has_command("legacy"));
        let names: Vec<&str> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["kept", "new"]);
    }
}
