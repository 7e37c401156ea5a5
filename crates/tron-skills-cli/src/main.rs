//! # tron-skills
//!
//! Inspect skill discovery, mention resolution, and session skill state from
//! the command line.

#![deny(unsafe_code)]

use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tron_settings::{SkillsSettings, TronSettings};
use tron_skills::ScanConfig;
use tron_skills::denials::{get_skill_subagent_mode, skill_frontmatter_to_denials};
use tron_skills::events::{SessionEventRecord, read_events_jsonl};
use tron_skills::injector::{
    build_message_with_skill_context, build_removed_skills_notice, process_prompt_for_skills,
};
use tron_skills::loader;
use tron_skills::mention::MentionDetector;
use tron_skills::registry::SkillRegistry;
use tron_skills::tracker::SkillTracker;
use tron_skills::types::{
    AddedSkillInfo, SkillInfo, SkillMetadata, SkillScanError, SkillScanResult, SkillSource,
    SkillSubagentMode, ToolDenialConfig,
};

/// Tron skills inspector.
#[derive(Parser, Debug)]
#[command(name = "tron-skills", about = "Inspect Tron skills and session skill state")]
struct Cli {
    /// Settings file (defaults to `~/.tron/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Project root for the project skill tier (defaults to the current directory).
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan both tiers and report skills and errors as JSON.
    Scan,
    /// List registered skills.
    List {
        /// Only show skills from this tier.
        #[arg(long)]
        source: Option<SourceArg>,
    },
    /// Search skills by name, description, and tags.
    Search {
        /// Search text.
        query: String,
    },
    /// Show one skill's full metadata as JSON (by name or command).
    Show {
        /// Skill name or command alias.
        name: String,
        /// Available tools, used to expand an `allowedTools` list into denials.
        #[arg(long, value_delimiter = ',')]
        tools: Vec<String>,
    },
    /// Resolve mentions in a prompt and print the message sent to the model.
    Resolve {
        /// User prompt.
        prompt: String,
        /// Explicitly selected skills, injected ahead of mentions.
        #[arg(long = "select")]
        selected: Vec<String>,
        /// Also inject skills marked `autoInject`.
        #[arg(long)]
        auto_inject: bool,
        /// Print the full injection result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Suggest skills for the mention being typed at the end of the text.
    Suggest {
        /// Input text so far.
        text: String,
        /// Trigger character.
        #[arg(long, default_value_t = '@')]
        trigger: char,
    },
    /// Rebuild a session's active skill set from a JSON Lines event log.
    Replay {
        /// Event log, one record per line.
        events: PathBuf,
        /// Stop after this event id (rewind).
        #[arg(long)]
        until: Option<String>,
        /// Order events by their `sequence` field first.
        #[arg(long)]
        sequenced: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Global,
    Project,
}

impl From<SourceArg> for SkillSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Global => Self::Global,
            SourceArg::Project => Self::Project,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref())?;
    init_subscriber(settings.logging.level.as_filter_str());

    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let config = scan_config(&settings.skills, &project_root);
    debug!(project = %project_root.display(), "Resolved scan config");

    match cli.command {
        Command::Scan => {
            let (global, project) = loader::scan_all(&config).await;
            let report = ScanReport {
                global: TierReport::from(global),
                project: TierReport::from(project),
            };
            print_json(&report)?;
        }
        Command::List { source } => {
            let registry = SkillRegistry::discover(&config).await;
            for info in registry.list_info(source.map(SkillSource::from)) {
                println!("{}", format_info(&info));
            }
        }
        Command::Search { query } => {
            let registry = SkillRegistry::discover(&config).await;
            for skill in registry.search(&query) {
                println!("{}", format_info(&SkillInfo::from(skill)));
            }
        }
        Command::Show { name, tools } => {
            let registry = SkillRegistry::discover(&config).await;
            let skill = registry
                .resolve(&name)
                .or_else(|| registry.get_by_command(&name))
                .with_context(|| format!("Skill not found: {name}"))?;
            print_json(&ShowReport::new(skill, &tools))?;
        }
        Command::Resolve {
            prompt,
            mut selected,
            auto_inject,
            json,
        } => {
            let registry = SkillRegistry::discover(&config).await;
            if auto_inject {
                let auto: Vec<String> =
                    registry.auto_inject().into_iter().map(|s| s.name.clone()).collect();
                selected = auto.into_iter().chain(selected).collect();
            }
            let result = process_prompt_for_skills(&prompt, &registry, &selected);
            if json {
                print_json(&result)?;
            } else {
                for name in &result.not_found_skills {
                    eprintln!("warning: unknown skill: {name}");
                }
                println!(
                    "{}",
                    build_message_with_skill_context(&result.cleaned_prompt, &result.skill_context)
                );
            }
        }
        Command::Suggest { text, trigger } => {
            let registry = SkillRegistry::discover(&config).await;
            let detector = MentionDetector::new(trigger);
            match detector.in_progress(&text) {
                Some(query) => {
                    for skill in registry.search(&query.query) {
                        println!("{trigger}{}\t{}", skill.name, skill.description);
                    }
                }
                None => {
                    if let Some(mention) = detector.completed(&text, &registry, &[]) {
                        println!("completed: {trigger}{}", mention.skill_name);
                    }
                }
            }
        }
        Command::Replay {
            events,
            until,
            sequenced,
        } => {
            let file = std::fs::File::open(&events)
                .with_context(|| format!("Failed to open event log: {}", events.display()))?;
            let records = read_events_jsonl(BufReader::new(file))
                .with_context(|| format!("Failed to read event log: {}", events.display()))?;
            let records = truncate_at(records, until.as_deref())?;

            let tracker = if sequenced {
                SkillTracker::from_sequenced_events(&records)
            } else {
                SkillTracker::from_events(&records)
            };
            print_json(&ReplayReport::new(records.len(), &tracker))?;
        }
    }

    Ok(())
}

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level`.
fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

fn load_settings(path: Option<&Path>) -> Result<TronSettings> {
    let path = path.map_or_else(tron_settings::settings_path, Path::to_path_buf);
    tron_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))
}

/// Scan configuration for `project_root` from the skills settings section.
fn scan_config(settings: &SkillsSettings, project_root: &Path) -> ScanConfig {
    ScanConfig::for_working_dir(project_root)
        .with_global_dirs(settings.global_dirs.iter().cloned())
        .with_project_dirs(settings.project_dirs.iter().cloned())
        .with_definition_file(settings.definition_file.clone())
        .with_max_file_size(settings.max_file_size)
}

/// Keep events up to and including `until`.
fn truncate_at(
    mut records: Vec<SessionEventRecord>,
    until: Option<&str>,
) -> Result<Vec<SessionEventRecord>> {
    let Some(until) = until else {
        return Ok(records);
    };
    let Some(index) = records.iter().position(|r| r.id == until) else {
        bail!("Event not found in log: {until}");
    };
    records.truncate(index + 1);
    Ok(records)
}

fn format_info(info: &SkillInfo) -> String {
    let command = info
        .command
        .as_deref()
        .map(|c| format!(" /{c}"))
        .unwrap_or_default();
    format!("{}\t{}{command}\t{}", info.name, info.source, info.description)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let encoded = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{encoded}");
    Ok(())
}

#[derive(Debug, Serialize)]
struct ScanReport {
    global: TierReport,
    project: TierReport,
}

#[derive(Debug, Serialize)]
struct TierReport {
    skills: Vec<SkillInfo>,
    errors: Vec<SkillScanError>,
}

impl From<SkillScanResult> for TierReport {
    fn from(result: SkillScanResult) -> Self {
        Self {
            skills: result.skills.iter().map(SkillInfo::from).collect(),
            errors: result.errors,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowReport<'a> {
    #[serde(flatten)]
    skill: &'a SkillMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_denials: Option<ToolDenialConfig>,
    subagent_mode: SkillSubagentMode,
}

impl<'a> ShowReport<'a> {
    fn new(skill: &'a SkillMetadata, available_tools: &[String]) -> Self {
        Self {
            skill,
            tool_denials: skill_frontmatter_to_denials(&skill.frontmatter, available_tools),
            subagent_mode: get_skill_subagent_mode(&skill.frontmatter),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayReport {
    events: usize,
    active_names: Vec<String>,
    active: Vec<AddedSkillInfo>,
    removed: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    removed_notice: String,
}

impl ReplayReport {
    fn new(events: usize, tracker: &SkillTracker) -> Self {
        Self {
            events,
            active_names: tracker.state().names().map(ToString::to_string).collect(),
            active: tracker.added_skills(),
            removed: tracker.removed_skill_names().iter().cloned().collect(),
            removed_notice: build_removed_skills_notice(tracker.removed_skill_names()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_resolve_with_selections() {
        let cli = Cli::parse_from([
            "tron-skills",
            "resolve",
            "use @git",
            "--select",
            "deploy",
            "--select",
            "review",
            "--json",
        ]);
        let Command::Resolve { selected, json, .. } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(selected, vec!["deploy", "review"]);
        assert!(json);
    }

    #[test]
    fn scan_config_follows_settings() {
        let settings = SkillsSettings {
            global_dirs: vec![".g".to_string()],
            project_dirs: vec![".p1".to_string(), ".p2".to_string()],
            definition_file: "skill.md".to_string(),
            max_file_size: 2048,
        };
        let config = scan_config(&settings, Path::new("/work"));
        assert_eq!(
            config.project_candidates(),
            vec![PathBuf::from("/work/.p1"), PathBuf::from("/work/.p2")]
        );
        assert_eq!(config.global_dirs, vec![".g"]);
        assert_eq!(config.limits.definition_file, "skill.md");
        assert_eq!(config.limits.max_file_size, 2048);
    }

    #[test]
    fn truncate_keeps_prefix_through_event() {
        let records = vec![
            SessionEventRecord::context_cleared(),
            SessionEventRecord::context_cleared(),
            SessionEventRecord::context_cleared(),
        ];
        let until = records[1].id.clone();
        assert_eq!(truncate_at(records.clone(), Some(until.as_str())).unwrap().len(), 2);
        assert_eq!(truncate_at(records.clone(), None).unwrap().len(), 3);
        assert!(truncate_at(records, Some("missing")).is_err());
    }

    #[test]
    fn replay_report_lists_active_and_removed() {
        use tron_skills::events::{SkillAddedPayload, SkillRemovedPayload};
        use tron_skills::types::{SkillAddMethod, SkillRemoveReason};

        let added = |name: &str| {
            SessionEventRecord::skill_added(&SkillAddedPayload {
                skill_name: name.to_string(),
                source: SkillSource::Project,
                added_via: SkillAddMethod::Explicit,
            })
        };
        let records = vec![
            added("git"),
            added("deploy"),
            SessionEventRecord::skill_removed(&SkillRemovedPayload {
                skill_name: "git".to_string(),
                removed_via: SkillRemoveReason::Manual,
            }),
        ];
        let report = ReplayReport::new(records.len(), &SkillTracker::from_events(&records));

        assert_eq!(report.events, 3);
        assert_eq!(report.active_names, vec!["deploy"]);
        assert_eq!(report.removed, vec!["git"]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["activeNames"], serde_json::json!(["deploy"]));
        assert!(value["removedNotice"].as_str().unwrap().contains("git"));
    }

    #[test]
    fn parses_show_tool_list() {
        let cli = Cli::parse_from(["tron-skills", "show", "deploy", "--tools", "Read,Bash"]);
        let Command::Show { name, tools } = cli.command else {
            panic!("expected show");
        };
        assert_eq!(name, "deploy");
        assert_eq!(tools, vec!["Read", "Bash"]);
    }

    #[tokio::test]
    async fn show_report_expands_allowed_tools() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join(".tron/skills/reader");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join("SKILL.md"),
            "---\nallowedTools: [Read]\nsubagent: ask\n---\nRead only.",
        )
        .unwrap();

        let settings = SkillsSettings {
            global_dirs: Vec::new(),
            ..SkillsSettings::default()
        };
        let registry = SkillRegistry::discover(&scan_config(&settings, dir.path())).await;
        let skill = registry.get("reader").unwrap();
        let tools = vec!["Read".to_string(), "Bash".to_string()];
        let value = serde_json::to_value(ShowReport::new(skill, &tools)).unwrap();

        assert_eq!(value["name"], "reader");
        assert_eq!(value["toolDenials"]["deniedTools"], serde_json::json!(["Bash"]));
        assert_eq!(value["subagentMode"], "ask");
    }

    #[test]
    fn load_settings_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"skills": {"definitionFile": "README.md"}}"#).unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.skills.definition_file, "README.md");
    }

    #[tokio::test]
    async fn discover_with_settings_config() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join(".tron/skills/deploy");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "---\ncommand: ship\n---\nShip it.").unwrap();

        let settings = SkillsSettings {
            global_dirs: Vec::new(),
            ..SkillsSettings::default()
        };
        let registry = SkillRegistry::discover(&scan_config(&settings, dir.path())).await;
        assert!(registry.has("deploy"));
        assert_eq!(registry.get_by_command("ship").unwrap().name, "deploy");
        assert_eq!(
            format_info(&SkillInfo::from(registry.get("deploy").unwrap())),
            "deploy\tproject /ship\tShip it."
        );
    }
}
