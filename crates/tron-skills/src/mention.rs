//! Trigger-prefixed mention detection.
//!
//! One [`MentionDetector`] per trigger character: `@` for skills, `%` for
//! ephemeral spells. A detector answers two questions about live input text:
//!
//! - [`in_progress`](MentionDetector::in_progress): is the user currently
//!   typing a mention? Returns the partial query for a suggestion popup.
//! - [`completed`](MentionDetector::completed): which finished mention
//!   should be resolved next? Scans newest-first.
//!
//! A trigger only counts when it sits at the start of the text or after
//! whitespace, and when an even number of backticks precede it (odd means it
//! is inside inline code or a fenced block).

use regex::Regex;

use crate::constants::{SKILL_TRIGGER, SPELL_TRIGGER};
use crate::registry::SkillRegistry;
use crate::types::{SkillReference, TextPosition};

/// A mention the user is still typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionQuery {
    /// Text typed after the trigger so far (may be empty).
    pub query: String,
    /// Byte offset of the trigger character.
    pub start: usize,
}

/// A finished mention that resolved to a known skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMention {
    /// The mention as located in the text.
    pub reference: SkillReference,
    /// Canonical registry name the mention resolved to.
    pub skill_name: String,
}

/// Detects `TRIGGER name` mentions for one trigger character.
#[derive(Debug, Clone)]
pub struct MentionDetector {
    trigger: char,
    pattern: Regex,
}

impl MentionDetector {
    /// Create a detector for `trigger`.
    pub fn new(trigger: char) -> Self {
        let escaped = regex::escape(trigger.encode_utf8(&mut [0; 4]));
        let pattern = Regex::new(&format!("{escaped}([A-Za-z0-9][A-Za-z0-9-]*)"))
            .expect("escaped trigger forms a valid pattern");
        Self { trigger, pattern }
    }

    /// Detector for `@skill` mentions.
    pub fn skills() -> Self {
        Self::new(SKILL_TRIGGER)
    }

    /// Detector for `%spell` mentions.
    pub fn spells() -> Self {
        Self::new(SPELL_TRIGGER)
    }

    /// The trigger character.
    pub fn trigger(&self) -> char {
        self.trigger
    }

    /// The mention being typed at the end of `text`, if any.
    ///
    /// Looks only at the last trigger in the text; it must be at a word
    /// boundary, outside inline code, and not yet followed by whitespace.
    pub fn in_progress(&self, text: &str) -> Option<MentionQuery> {
        let start = text.rfind(self.trigger)?;
        if !self.is_live_trigger(text, start) {
            return None;
        }
        let query = &text[start + self.trigger.len_utf8()..];
        if query.chars().any(char::is_whitespace) {
            return None;
        }
        Some(MentionQuery {
            query: query.to_string(),
            start,
        })
    }

    /// Every completed, boundary-valid mention in textual order.
    ///
    /// A mention is completed once its name is followed by whitespace or the
    /// end of the text. Names are not resolved here.
    pub fn references(&self, text: &str) -> Vec<SkillReference> {
        self.pattern
            .captures_iter(text)
            .filter_map(|cap| {
                let full = cap.get(0)?;
                let name = cap.get(1)?;
                let terminated = text[full.end()..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace);
                (terminated && self.is_live_trigger(text, full.start())).then(|| SkillReference {
                    original: full.as_str().to_string(),
                    name: name.as_str().to_string(),
                    position: TextPosition {
                        start: full.start(),
                        end: full.end(),
                    },
                })
            })
            .collect()
    }

    /// The most recent completed mention of a known, not-yet-selected skill.
    ///
    /// Resolution against the registry ignores case, as does the comparison
    /// with `already_selected`.
    pub fn completed(
        &self,
        text: &str,
        registry: &SkillRegistry,
        already_selected: &[String],
    ) -> Option<CompletedMention> {
        self.completed_with(
            text,
            |name| registry.resolve(name).map(|s| s.name.clone()),
            already_selected,
        )
    }

    /// Like [`completed`](Self::completed) with a caller-supplied resolver
    /// returning the canonical name for a typed name.
    pub fn completed_with<F>(
        &self,
        text: &str,
        resolve: F,
        already_selected: &[String],
    ) -> Option<CompletedMention>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.references(text).into_iter().rev().find_map(|reference| {
            let skill_name = resolve(&reference.name)?;
            let selected = already_selected
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&skill_name));
            (!selected).then_some(CompletedMention {
                reference,
                skill_name,
            })
        })
    }

    /// Trigger at `pos` is at a word boundary and outside inline code.
    fn is_live_trigger(&self, text: &str, pos: usize) -> bool {
        let prefix = &text[..pos];
        let at_boundary = prefix.chars().next_back().is_none_or(char::is_whitespace);
        at_boundary && prefix.matches('`').count() % 2 == 0
    }
}
