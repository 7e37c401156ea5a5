//! Filesystem skill scanner.
//!
//! Discovers skills by scanning directories for folders containing the
//! definition file (`SKILL.md` by default). Each tier (global, project) has an
//! ordered list of candidate directories. Candidate directories are scanned
//! concurrently on the blocking pool and merged afterwards in priority order,
//! so the result never depends on which scan finishes first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{ScanConfig, ScanLimits};
use crate::errors::{Result, SkillError};
use crate::parser::parse_skill_md;
use crate::types::{SkillMetadata, SkillScanError, SkillScanResult, SkillSource};

/// Maximum folder depth walked when listing a skill's auxiliary files.
const ADDITIONAL_FILES_MAX_DEPTH: usize = 4;

/// Scan a single directory for skill folders.
///
/// - Non-existent directories return empty results (not errors).
/// - A directory that cannot be enumerated yields one non-recoverable error.
/// - Subdirectories without a definition file are skipped silently.
/// - A skill that fails to load yields one recoverable error and is skipped.
/// - An entry that cannot be read yields one recoverable error and is skipped.
///
/// Entries are visited in file-name order.
pub fn scan_directory(dir: &Path, source: SkillSource, limits: &ScanLimits) -> SkillScanResult {
    let mut result = SkillScanResult::default();

    if !dir.exists() {
        return result;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to read skills directory");
            result.errors.push(SkillScanError {
                path: dir.to_string_lossy().into_owned(),
                message: format!("Failed to read directory: {e}"),
                recoverable: false,
            });
            return result;
        }
    };

    let entries = entries.map(|entry| entry.map(|e| e.path()));
    for folder in collect_folders(dir, entries, &mut result.errors) {
        if !folder.join(&limits.definition_file).is_file() {
            continue;
        }

        match load_skill(&folder, source, limits) {
            Ok(skill) => {
                debug!(name = %skill.name, source = %source, "Loaded skill");
                result.skills.push(skill);
            }
            Err(e) => {
                warn!(path = %folder.display(), error = %e, "Failed to load skill");
                result.errors.push(SkillScanError {
                    path: folder.to_string_lossy().into_owned(),
                    message: e.to_string(),
                    recoverable: true,
                });
            }
        }
    }

    result
}

/// Subdirectories among `entries`, sorted. Unreadable entries are recorded
/// as recoverable errors against `dir`.
fn collect_folders(
    dir: &Path,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
    errors: &mut Vec<SkillScanError>,
) -> Vec<PathBuf> {
    let mut folders = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_dir() => folders.push(path),
            Ok(_) => {}
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read skills directory entry");
                errors.push(SkillScanError {
                    path: dir.to_string_lossy().into_owned(),
                    message: format!("Failed to read directory entry: {e}"),
                    recoverable: true,
                });
            }
        }
    }
    folders.sort();
    folders
}

/// Scan every candidate directory of one tier concurrently.
///
/// Each directory is scanned on the blocking pool. Results are joined in the
/// order of `dirs` and merged with [`merge_first_wins`], so the directory
/// listed first wins when two define the same skill name.
pub async fn scan_tier(dirs: &[PathBuf], source: SkillSource, limits: &ScanLimits) -> SkillScanResult {
    let handles = dirs.iter().map(|dir| {
        let dir = dir.clone();
        let limits = limits.clone();
        async move {
            let scan_dir = dir.clone();
            tokio::task::spawn_blocking(move || scan_directory(&scan_dir, source, &limits))
                .await
                .unwrap_or_else(|e| {
                    warn!(dir = %dir.display(), error = %e, "Skill scan task failed");
                    SkillScanResult {
                        skills: Vec::new(),
                        errors: vec![SkillScanError {
                            path: dir.to_string_lossy().into_owned(),
                            message: format!("Scan task failed: {e}"),
                            recoverable: false,
                        }],
                    }
                })
        }
    });

    let results = futures::future::join_all(handles).await;
    merge_first_wins(results)
}

/// Scan both tiers concurrently.
///
/// Returns `(global_result, project_result)`. Tiers are kept apart: project
/// over global precedence is applied by the registry, not here.
pub async fn scan_all(config: &ScanConfig) -> (SkillScanResult, SkillScanResult) {
    let global_dirs = config.global_candidates();
    let project_dirs = config.project_candidates();

    tokio::join!(
        scan_tier(&global_dirs, SkillSource::Global, &config.limits),
        scan_tier(&project_dirs, SkillSource::Project, &config.limits),
    )
}

/// Merge per-directory results of one tier, keeping the first skill seen
/// for each name. Later duplicates are dropped silently; all errors are kept.
pub fn merge_first_wins(results: impl IntoIterator<Item = SkillScanResult>) -> SkillScanResult {
    let mut merged = SkillScanResult::default();
    let mut seen = HashSet::new();

    for result in results {
        for skill in result.skills {
            if seen.insert(skill.name.clone()) {
                merged.skills.push(skill);
            } else {
                debug!(name = %skill.name, path = %skill.path, "Duplicate skill in lower-priority directory dropped");
            }
        }
        merged.errors.extend(result.errors);
    }

    merged
}

/// Load a single skill from its folder.
pub fn load_skill(
    skill_path: &Path,
    source: SkillSource,
    limits: &ScanLimits,
) -> Result<SkillMetadata> {
    let name = skill_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| SkillError::InvalidName {
            path: skill_path.to_path_buf(),
        })?;
    let skill_md_path = skill_path.join(&limits.definition_file);

    let metadata = std::fs::metadata(&skill_md_path).map_err(|source| SkillError::Io {
        path: skill_md_path.clone(),
        source,
    })?;

    let size = metadata.len();
    if size > limits.max_file_size {
        return Err(SkillError::FileTooLarge {
            size,
            max: limits.max_file_size,
        });
    }

    let bytes = std::fs::read(&skill_md_path).map_err(|source| SkillError::Io {
        path: skill_md_path.clone(),
        source,
    })?;
    let raw = String::from_utf8(bytes).map_err(|_| SkillError::NotUtf8 {
        path: skill_md_path.clone(),
    })?;

    let parsed = parse_skill_md(&raw)?;

    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

    let display_name = parsed
        .frontmatter
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| name.clone());

    let description = parsed
        .frontmatter
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or(parsed.description);

    Ok(SkillMetadata {
        additional_files: list_additional_files(skill_path, &limits.definition_file),
        name,
        display_name,
        description,
        content: parsed.content,
        frontmatter: parsed.frontmatter,
        source,
        path: skill_path.to_string_lossy().into_owned(),
        skill_md_path: skill_md_path.to_string_lossy().into_owned(),
        last_modified,
    })
}

/// List auxiliary files under a skill folder (everything except the
/// top-level definition file), as sorted `/`-separated relative paths.
fn list_additional_files(skill_path: &Path, definition_file: &str) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(skill_path)
        .min_depth(1)
        .max_depth(ADDITIONAL_FILES_MAX_DEPTH)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(skill_path).ok()?;
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("/"))
        })
        .filter(|relative| relative != definition_file)
        .collect();
    files.sort();
    files
}
