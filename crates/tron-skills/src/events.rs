//! Session event records consumed by the skill tracker.
//!
//! The session log is an ordered sequence of [`SessionEventRecord`]s shaped
//! `{id, type, payload}`. The payload is kept as opaque JSON so records of
//! types this crate does not know pass through untouched; typed access for
//! the four types the tracker cares about goes through [`TrackerEvent`].

use std::io::BufRead;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::types::{SkillAddMethod, SkillMetadata, SkillRemoveReason, SkillSource};

/// Event type: a skill entered the session context.
pub const SKILL_ADDED: &str = "skill.added";
/// Event type: a skill left the session context.
pub const SKILL_REMOVED: &str = "skill.removed";
/// Event type: the whole context was cleared.
pub const CONTEXT_CLEARED: &str = "context.cleared";
/// Event type: the context was compacted.
pub const COMPACT_BOUNDARY: &str = "compact.boundary";

/// One persisted session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEventRecord {
    /// Unique event ID (UUID v7 when created here).
    pub id: String,
    /// Event type discriminator.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event-specific data (opaque JSON).
    #[serde(default)]
    pub payload: Value,
    /// Monotonic sequence number within the session, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
}

/// Payload of a `skill.added` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAddedPayload {
    /// Skill name.
    pub skill_name: String,
    /// Source tier. Unrecognised values read as the default.
    #[serde(default, deserialize_with = "lenient")]
    pub source: SkillSource,
    /// How the skill was added. Unrecognised values read as the default.
    #[serde(default, deserialize_with = "lenient")]
    pub added_via: SkillAddMethod,
}

impl SkillAddedPayload {
    /// Payload describing `skill` entering the context via `added_via`.
    pub fn for_skill(skill: &SkillMetadata, added_via: SkillAddMethod) -> Self {
        Self {
            skill_name: skill.name.clone(),
            source: skill.source,
            added_via,
        }
    }
}

/// Payload of a `skill.removed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRemovedPayload {
    /// Skill name.
    pub skill_name: String,
    /// Why it was removed. Unrecognised values read as the default.
    #[serde(default, deserialize_with = "lenient")]
    pub removed_via: SkillRemoveReason,
}

/// Decode a field, falling back to `T::default()` when the value is not one
/// this version understands. Newer writers may add variants.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

impl SessionEventRecord {
    /// Record with a fresh UUID v7 id.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            event_type: event_type.into(),
            payload,
            sequence: None,
        }
    }

    /// A `skill.added` record.
    pub fn skill_added(payload: &SkillAddedPayload) -> Self {
        Self::new(SKILL_ADDED, to_value(payload))
    }

    /// A `skill.removed` record.
    pub fn skill_removed(payload: &SkillRemovedPayload) -> Self {
        Self::new(SKILL_REMOVED, to_value(payload))
    }

    /// A `context.cleared` record.
    pub fn context_cleared() -> Self {
        Self::new(CONTEXT_CLEARED, Value::Object(serde_json::Map::new()))
    }

    /// A `compact.boundary` record.
    pub fn compact_boundary() -> Self {
        Self::new(COMPACT_BOUNDARY, Value::Object(serde_json::Map::new()))
    }

    /// Set the sequence number.
    #[must_use]
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Decode into the tracker's view of this event.
    pub fn tracker_event(&self) -> TrackerEvent {
        TrackerEvent::from_record(self)
    }
}

fn to_value<T: Serialize>(payload: &T) -> Value {
    // Plain structs of strings and unit enums always serialize.
    serde_json::to_value(payload).unwrap_or_default()
}

/// What a session event means to the skill tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// `skill.added`.
    SkillAdded(SkillAddedPayload),
    /// `skill.removed`.
    SkillRemoved(SkillRemovedPayload),
    /// `context.cleared` or `compact.boundary`.
    Reset(SkillRemoveReason),
    /// Any other type, or a known type with an unusable payload.
    Ignored,
}

impl TrackerEvent {
    /// Decode a record. Never fails: unknown or malformed events are
    /// [`TrackerEvent::Ignored`].
    pub fn from_record(record: &SessionEventRecord) -> Self {
        match record.event_type.as_str() {
            SKILL_ADDED => decode::<SkillAddedPayload>(record)
                .filter(|p| !p.skill_name.is_empty())
                .map_or(Self::Ignored, Self::SkillAdded),
            SKILL_REMOVED => decode::<SkillRemovedPayload>(record)
                .filter(|p| !p.skill_name.is_empty())
                .map_or(Self::Ignored, Self::SkillRemoved),
            CONTEXT_CLEARED => Self::Reset(SkillRemoveReason::Clear),
            COMPACT_BOUNDARY => Self::Reset(SkillRemoveReason::Compact),
            _ => Self::Ignored,
        }
    }
}

fn decode<T: DeserializeOwned>(record: &SessionEventRecord) -> Option<T> {
    match serde_json::from_value(record.payload.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(event_id = %record.id, event_type = %record.event_type, error = %e, "Malformed skill event payload, ignoring");
            None
        }
    }
}

/// Errors reading an event log file.
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    /// Reading the underlying stream failed.
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),
    /// A line was not a valid event record.
    #[error("invalid event on line {line}: {source}")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON Lines event log. Blank lines are skipped.
pub fn read_events_jsonl(reader: impl BufRead) -> Result<Vec<SessionEventRecord>, EventLogError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| EventLogError::InvalidLine {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}
