use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One ranked match candidate, as stored on the line at suggestion time and
/// carried forward into the terminal states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    pub installment_id: i32,
    pub entry_id: i32,
    /// Heuristic confidence, 50-100.
    pub confidence: i32,
    pub entry_description: String,
    pub due_date: Option<NaiveDate>,
    pub installment_number: i32,
}

/// Match metadata keyed by the line's match status.
///
/// Every variant carries the ranked candidate list: the suggestion engine
/// stores it even when the top score stays below the suggestion threshold,
/// and confirm/ignore merge their fields on top instead of discarding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchMeta {
    Unmatched {
        #[serde(default)]
        candidates: Vec<SuggestionCandidate>,
    },
    Suggested {
        candidates: Vec<SuggestionCandidate>,
    },
    Confirmed {
        confirmed_at: NaiveDateTime,
        #[serde(default)]
        candidates: Vec<SuggestionCandidate>,
    },
    Ignored {
        ignored_at: NaiveDateTime,
        reason: Option<String>,
        #[serde(default)]
        candidates: Vec<SuggestionCandidate>,
    },
}

impl Default for MatchMeta {
    fn default() -> Self {
        MatchMeta::Unmatched { candidates: vec![] }
    }
}

impl MatchMeta {
    /// The candidate list stored by the last suggestion run, if any.
    pub fn candidates(&self) -> &[SuggestionCandidate] {
        match self {
            MatchMeta::Unmatched { candidates }
            | MatchMeta::Suggested { candidates }
            | MatchMeta::Confirmed { candidates, .. }
            | MatchMeta::Ignored { candidates, .. } => candidates,
        }
    }

    /// Confidence recorded for the given installment in the stored
    /// candidate list. `None` when the confirmation did not originate from
    /// a suggestion.
    pub fn confidence_for(&self, installment_id: i32) -> Option<i32> {
        self.candidates()
            .iter()
            .find(|c| c.installment_id == installment_id)
            .map(|c| c.confidence)
    }

    /// Encode for storage in the line's Json column.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("match metadata serialization cannot fail")
    }
}
