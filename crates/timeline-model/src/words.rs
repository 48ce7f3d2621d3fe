//! Word-level transcription markers.
//!
//! Produced by the transcription subsystem; the export engine reads them to
//! compute keep-segments when word-level cuts are active.

use serde::{Deserialize, Serialize};

/// Keep/remove state of a transcribed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordFilterState {
    /// Word is kept.
    #[default]
    None,

    /// Removal suggested by the AI filler-word pass.
    Ai,

    /// Removal requested explicitly by the user.
    UserRemove,
}

impl WordFilterState {
    /// Whether this state marks the word for removal.
    pub fn is_removed(self) -> bool {
        matches!(self, WordFilterState::Ai | WordFilterState::UserRemove)
    }
}

/// A single transcribed word with timing and filter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordItem {
    pub id: String,

    pub text: String,

    /// Start time in seconds.
    pub start: f64,

    /// End time in seconds.
    pub end: f64,

    #[serde(default)]
    pub filter_state: WordFilterState,
}

impl WordItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            start,
            end,
            filter_state: WordFilterState::None,
        }
    }

    pub fn with_state(mut self, state: WordFilterState) -> Self {
        self.filter_state = state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_states() {
        assert!(!WordFilterState::None.is_removed());
        assert!(WordFilterState::Ai.is_removed());
        assert!(WordFilterState::UserRemove.is_removed());
    }

    #[test]
    fn test_word_roundtrip_defaults_to_kept() {
        let json = r#"{"id":"w1","text":"hello","start":0.5,"end":0.9}"#;
        let word: WordItem = serde_json::from_str(json).unwrap();
        assert_eq!(word.filter_state, WordFilterState::None);
        assert!((word.end - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let word = WordItem::new("w", "um", 1.0, 1.2).with_state(WordFilterState::UserRemove);
        let json = serde_json::to_string(&word).unwrap();
        assert!(json.contains("\"user_remove\""));
    }
}
