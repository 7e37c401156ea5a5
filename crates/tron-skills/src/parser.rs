//! SKILL.md parser.
//!
//! Parses SKILL.md files with optional YAML frontmatter delimited by `---`
//! lines. The header is decoded with `serde_yaml`; each recognized key is
//! decoded on its own so a wrongly-typed field is dropped rather than failing
//! the whole skill. A header that is not strict YAML (for example an unquoted
//! colon inside a description) is re-read line by line as `key: value`
//! pairs. Only a header with no readable pair at all is an error.

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::constants::MAX_DESCRIPTION_LEN;
use crate::errors::Result;
use crate::types::{SkillExample, SkillFrontmatter, SkillSubagentMode};

/// Result of parsing a SKILL.md file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSkillMd {
    /// Parsed YAML frontmatter (empty defaults if none present).
    pub frontmatter: SkillFrontmatter,
    /// Content after frontmatter (the markdown body).
    pub content: String,
    /// First non-header, non-empty line (up to 200 bytes).
    pub description: String,
}

/// Parse a SKILL.md file's raw content into frontmatter, body, and description.
pub fn parse_skill_md(raw_content: &str) -> Result<ParsedSkillMd> {
    let (yaml, body) = split_frontmatter(raw_content);
    let frontmatter = match yaml {
        Some(yaml) => parse_frontmatter(yaml)?,
        None => SkillFrontmatter::default(),
    };
    let description = extract_description(body);

    Ok(ParsedSkillMd {
        frontmatter,
        content: body.to_string(),
        description,
    })
}

/// Split `---` delimited frontmatter from the body.
///
/// Returns `(yaml, body)`. Without an opening and a closing delimiter line
/// the whole input is the body.
fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let start = content.len() - content.trim_start().len();
    let rest = &content[start..];

    let Some(after_open) = strip_delimiter_line(rest) else {
        return (None, content);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, content)
}

/// If `s` starts with a `---` line, return what follows it.
fn strip_delimiter_line(s: &str) -> Option<&str> {
    let line_end = s.find('\n').map_or(s.len(), |i| i + 1);
    (s[..line_end].trim_end() == "---").then(|| &s[line_end..])
}

/// Decode the YAML header into [`SkillFrontmatter`].
fn parse_frontmatter(yaml: &str) -> Result<SkillFrontmatter> {
    if yaml.trim().is_empty() {
        return Ok(SkillFrontmatter::default());
    }

    let map = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => map,
        Ok(_) => {
            debug!("frontmatter is not a mapping, ignoring");
            return Ok(SkillFrontmatter::default());
        }
        Err(e) => match parse_key_value_lines(yaml) {
            Some(map) => {
                debug!(error = %e, "frontmatter is not strict YAML, reading it line by line");
                map
            }
            None => return Err(e.into()),
        },
    };

    Ok(SkillFrontmatter {
        name: lookup(&map, &["name"]).and_then(scalar_string),
        description: lookup(&map, &["description"]).and_then(scalar_string),
        command: lookup(&map, &["command"]).and_then(scalar_string),
        version: lookup(&map, &["version"]).and_then(scalar_string),
        author: lookup(&map, &["author"]).and_then(scalar_string),
        tags: lookup(&map, &["tags"]).map(string_list),
        arguments: lookup(&map, &["arguments", "args"]).map(|v| typed_list(v, "arguments")),
        dependencies: lookup(&map, &["dependencies"]).map(string_list),
        examples: lookup(&map, &["examples"]).map(example_list),
        auto_inject: lookup(&map, &["autoInject", "auto_inject"]).and_then(boolean),
        tools: lookup(&map, &["tools"]).map(string_list),
        allowed_tools: lookup(&map, &["allowedTools", "allowed_tools"]).map(string_list),
        denied_tools: lookup(&map, &["deniedTools", "denied_tools"]).map(string_list),
        denied_patterns: lookup(&map, &["deniedPatterns", "denied_patterns"])
            .map(|v| typed_list(v, "deniedPatterns")),
        subagent: lookup(&map, &["subagent"]).and_then(subagent_mode),
        subagent_model: lookup(&map, &["subagentModel", "subagent_model"])
            .and_then(scalar_string),
    })
}

/// Read a header as top-level `key: value` lines, splitting at the first
/// colon. A key with an empty value collects the `- item` lines below it.
/// Other indented lines are skipped.
///
/// Returns `None` when no pair was found.
fn parse_key_value_lines(yaml: &str) -> Option<Mapping> {
    let mut map = Mapping::new();
    let mut lines = yaml.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let value = if value.is_empty() {
            let mut items = Vec::new();
            while let Some(item) = lines
                .peek()
                .copied()
                .and_then(|l| l.trim().strip_prefix('-'))
            {
                items.push(inline_value(item.trim()));
                let _ = lines.next();
            }
            if items.is_empty() {
                Value::Null
            } else {
                Value::Sequence(items)
            }
        } else {
            inline_value(value)
        };
        let _ = map.insert(Value::String(key.to_string()), value);
    }

    (!map.is_empty()).then_some(map)
}

/// A single value from a `key: value` line: a YAML scalar or flow list when
/// it parses as one, otherwise the raw text with surrounding quotes removed.
fn inline_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value) if !matches!(value, Value::Mapping(_)) => value,
        _ => Value::String(unquote(raw).to_string()),
    }
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    [('"', '"'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| {
            s.strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .unwrap_or(s)
}

fn lookup<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| map.get(*key))
        .filter(|v| !v.is_null())
}

/// Render a scalar as a string. `version: 1.0` arrives as a number.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => {
            debug!(?value, "expected scalar frontmatter value, ignoring");
            None
        }
    }
}

/// A list of scalars, or a single scalar treated as a one-item list.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

/// A list of mappings decoded one by one; malformed items are skipped.
fn typed_list<T: DeserializeOwned>(value: &Value, key: &str) -> Vec<T> {
    let Value::Sequence(items) = value else {
        debug!(key, "frontmatter value is not a list, ignoring");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_yaml::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(key, error = %e, "skipping malformed frontmatter item");
                None
            }
        })
        .collect()
}

fn example_list(value: &Value) -> Vec<SkillExample> {
    let Value::Sequence(items) = value else {
        return string_list(value)
            .into_iter()
            .map(|command| SkillExample {
                command,
                description: None,
            })
            .collect();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Mapping(_) => serde_yaml::from_value(item.clone()).ok(),
            other => scalar_string(other).map(|command| SkillExample {
                command,
                description: None,
            }),
        })
        .collect()
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn subagent_mode(value: &Value) -> Option<SkillSubagentMode> {
    match value {
        Value::Bool(true) => Some(SkillSubagentMode::Yes),
        Value::Bool(false) => Some(SkillSubagentMode::No),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "true" => Some(SkillSubagentMode::Yes),
            "ask" => Some(SkillSubagentMode::Ask),
            "no" | "false" => Some(SkillSubagentMode::No),
            _ => None,
        },
        _ => None,
    }
}

/// Extract a description from the content body.
///
/// Returns the first non-header, non-empty, non-horizontal-rule line outside
/// fenced code, truncated to [`MAX_DESCRIPTION_LEN`] bytes.
fn extract_description(content: &str) -> String {
    let mut in_code_block = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block
            || trimmed.is_empty()
            || trimmed.starts_with('#')
            || is_horizontal_rule(trimmed)
        {
            continue;
        }

        return truncate_str(trimmed, MAX_DESCRIPTION_LEN).to_string();
    }

    String::new()
}

/// Check if a line is a markdown horizontal rule.
fn is_horizontal_rule(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && line.len() >= 3 && chars.all(|c| c == first)
}

/// Longest prefix of `s` within `max_bytes` that ends on a char boundary.
fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
