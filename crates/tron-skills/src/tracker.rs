//! Per-session skill tracker.
//!
//! The active skill set is plain state ([`ActiveSkillSet`]) advanced by a pure
//! reducer ([`apply_event`]). [`SkillTracker::from_events`] is a left fold of
//! that reducer from the empty set, which covers every way a session is
//! reopened:
//!
//! - **Resume**: fold the session's full history.
//! - **Fork**: fold the parent's events up to the fork point followed by the
//!   fork's own events.
//! - **Rewind**: fold only the prefix up to the checkpoint.
//!
//! Events are folded in the order given. An event whose `id` was already
//! applied is skipped, so a duplicated delivery cannot resurrect a removed
//! skill. [`SkillTracker::from_sequenced_events`] sorts a single-session slice
//! by `sequence` before folding.
//!
//! `%spell` mentions are ephemeral: they are recorded for the current context
//! only, never replayed from events, and dropped on every reset.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::events::{SessionEventRecord, TrackerEvent};
use crate::types::{AddedSkillInfo, SkillAddMethod, SkillSource};

/// Tracking information for one active skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSkill {
    /// Source tier.
    pub source: SkillSource,
    /// How it was added.
    pub added_via: SkillAddMethod,
    /// Event that added it.
    pub event_id: Option<String>,
    /// Content length in bytes, for token estimates.
    pub content_length: Option<usize>,
}

/// The active skill set of one session.
///
/// Entries keep the order in which they were (last) added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSkillSet {
    skills: IndexMap<String, TrackedSkill>,
    removed: BTreeSet<String>,
    used_spells: Vec<String>,
    applied_event_ids: HashSet<String>,
}

impl ActiveSkillSet {
    fn insert(&mut self, name: String, tracked: TrackedSkill) {
        let _ = self.removed.remove(&name);
        // Re-adding moves the entry to the end.
        let _ = self.skills.shift_remove(&name);
        let _ = self.skills.insert(name, tracked);
    }

    fn remove(&mut self, name: &str) -> bool {
        if self.skills.shift_remove(name).is_some() {
            let _ = self.removed.insert(name.to_string());
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.skills.clear();
        self.removed.clear();
        self.used_spells.clear();
    }

    /// Names of active skills, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.skills.keys().map(String::as_str)
    }

    /// Spells used since the last reset, in first-use order.
    pub fn used_spells(&self) -> &[String] {
        &self.used_spells
    }
}

/// Advance `state` by one event.
///
/// Unknown event types and malformed payloads leave the state unchanged.
pub fn apply_event(mut state: ActiveSkillSet, event: &SessionEventRecord) -> ActiveSkillSet {
    if !event.id.is_empty() && !state.applied_event_ids.insert(event.id.clone()) {
        debug!(event_id = %event.id, "Skipping already-applied event");
        return state;
    }

    match event.tracker_event() {
        TrackerEvent::SkillAdded(payload) => {
            let event_id = (!event.id.is_empty()).then(|| event.id.clone());
            state.insert(
                payload.skill_name,
                TrackedSkill {
                    source: payload.source,
                    added_via: payload.added_via,
                    event_id,
                    content_length: None,
                },
            );
        }
        TrackerEvent::SkillRemoved(payload) => {
            let _ = state.remove(&payload.skill_name);
        }
        TrackerEvent::Reset(reason) => {
            debug!(event_id = %event.id, ?reason, cleared = state.skills.len(), "Skill context reset");
            state.reset();
        }
        TrackerEvent::Ignored => {}
    }

    state
}

/// Per-session tracker of active skills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillTracker {
    state: ActiveSkillSet,
}

impl SkillTracker {
    /// Create a new empty skill tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct tracker state by folding `events` in the order given.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a SessionEventRecord>) -> Self {
        let mut tracker = Self::new();
        tracker.apply_all(events);
        tracker
    }

    /// Reconstruct from one session's events, ordered by `sequence` first.
    ///
    /// The sort is stable. Events without a sequence number keep their
    /// relative order after all sequenced ones. Do not use this for fork
    /// concatenations: a fork's sequence numbers restart.
    pub fn from_sequenced_events(events: &[SessionEventRecord]) -> Self {
        let mut ordered: Vec<&SessionEventRecord> = events.iter().collect();
        ordered.sort_by_key(|e| e.sequence.map_or((1, 0), |seq| (0, seq)));
        Self::from_events(ordered)
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &SessionEventRecord) {
        let state = std::mem::take(&mut self.state);
        self.state = apply_event(state, event);
    }

    /// Apply events in order.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a SessionEventRecord>) {
        let state = std::mem::take(&mut self.state);
        self.state = events.into_iter().fold(state, apply_event);
        debug!(active = self.state.skills.len(), "Skill tracker replayed");
    }

    /// Record a skill as added to the session context.
    ///
    /// Replaces an existing entry with the same name.
    pub fn add_skill(
        &mut self,
        name: String,
        source: SkillSource,
        added_via: SkillAddMethod,
        event_id: Option<String>,
    ) {
        if let Some(id) = &event_id {
            let _ = self.state.applied_event_ids.insert(id.clone());
        }
        self.state.insert(
            name,
            TrackedSkill {
                source,
                added_via,
                event_id,
                content_length: None,
            },
        );
    }

    /// Record a skill as removed. Returns `true` if it was present.
    pub fn remove_skill(&mut self, name: &str) -> bool {
        self.state.remove(name)
    }

    /// Set the content length for a tracked skill (used for token estimation).
    pub fn set_content_length(&mut self, name: &str, length: usize) {
        if let Some(skill) = self.state.skills.get_mut(name) {
            skill.content_length = Some(length);
        }
    }

    /// Check if a skill is currently active.
    pub fn has_skill(&self, name: &str) -> bool {
        self.state.skills.contains_key(name)
    }

    /// Snapshot of active skills in the order they were added.
    ///
    /// Token count is estimated at ~4 bytes per token from content length.
    pub fn added_skills(&self) -> Vec<AddedSkillInfo> {
        self.state
            .skills
            .iter()
            .map(|(name, tracked)| AddedSkillInfo {
                name: name.clone(),
                source: tracked.source,
                added_via: tracked.added_via,
                event_id: tracked.event_id.clone(),
                tokens: tracked.content_length.map(|len| (len as u64).div_ceil(4)),
            })
            .collect()
    }

    /// Get the number of currently active skills.
    pub fn count(&self) -> usize {
        self.state.skills.len()
    }

    /// Skills removed since the last reset, sorted.
    pub fn removed_skill_names(&self) -> &BTreeSet<String> {
        &self.state.removed
    }

    /// Record that an ephemeral spell was used. Repeats are ignored.
    pub fn add_used_spell(&mut self, spell_name: String) {
        if !self.state.used_spells.contains(&spell_name) {
            self.state.used_spells.push(spell_name);
        }
    }

    /// Spells used since the last reset.
    pub fn used_spell_names(&self) -> &[String] {
        self.state.used_spells()
    }

    /// Clear all tracked skills and spells (context clear/compaction).
    pub fn clear(&mut self) {
        self.state.reset();
    }

    /// Underlying state.
    pub fn state(&self) -> &ActiveSkillSet {
        &self.state
    }
}
