use std::fmt;

use serde::{Deserialize, Serialize};

/// Experimental arm a session ran under.
///
/// Inferred from the free-form session id, so classification is best effort:
/// ids that match no known tag land in [`Condition::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Rumination and meta-cognitive self-regulation enabled
    FullSystem,
    /// Rumination without meta-cognition
    NoMetaCognition,
    /// Personality and emotion, no rumination
    NoRumination,
    /// Beliefs and drives only
    OptimalBaseline,
    Unknown,
}

/// Substring tags in match order. Earlier entries win when an id carries more
/// than one tag.
const VOCABULARY: &[(&str, Condition)] = &[
    ("tier7", Condition::FullSystem),
    ("tier6", Condition::NoMetaCognition),
    ("tier5", Condition::NoRumination),
    ("optimal", Condition::OptimalBaseline),
];

impl Condition {
    pub const KNOWN: [Condition; 4] = [
        Self::FullSystem,
        Self::NoMetaCognition,
        Self::NoRumination,
        Self::OptimalBaseline,
    ];

    /// Partial classifier: `None` when the id carries no known tag.
    pub fn match_tag(session_id: &str) -> Option<Self> {
        let lowered = session_id.to_lowercase();
        VOCABULARY
            .iter()
            .find(|(tag, _)| lowered.contains(tag))
            .map(|&(_, condition)| condition)
    }

    pub fn infer(session_id: &str) -> Self {
        Self::match_tag(session_id).unwrap_or(Self::Unknown)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::FullSystem => "tier7",
            Self::NoMetaCognition => "tier6",
            Self::NoRumination => "tier5",
            Self::OptimalBaseline => "optimal",
            Self::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FullSystem => "TIER 7 (full system)",
            Self::NoMetaCognition => "TIER 6 (no meta-cognition)",
            Self::NoRumination => "TIER 5 (no rumination)",
            Self::OptimalBaseline => "optimal baseline",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::Condition;

    #[test]
    fn tags_match_case_insensitively() {
        assert_eq!(Condition::infer("TIER7_run_001"), Condition::FullSystem);
        assert_eq!(Condition::infer("exp_tier6_run03"), Condition::NoMetaCognition);
        assert_eq!(Condition::infer("Tier5_Baseline"), Condition::NoRumination);
        assert_eq!(Condition::infer("optimal_baseline"), Condition::OptimalBaseline);
    }

    #[test]
    fn identical_data_splits_on_id_alone() {
        assert_ne!(Condition::infer("tier6_run1"), Condition::infer("tier5_run1"));
        assert_eq!(Condition::infer("tier6_run1"), Condition::NoMetaCognition);
        assert_eq!(Condition::infer("tier5_run1"), Condition::NoRumination);
    }

    #[test]
    fn unmatched_ids_are_unknown_not_guessed() {
        assert_eq!(Condition::match_tag("session_1700000000"), None);
        assert_eq!(Condition::infer("T6_run_001"), Condition::Unknown);
        assert_eq!(Condition::infer(""), Condition::Unknown);
    }

    #[test]
    fn earlier_vocabulary_entries_win() {
        assert_eq!(Condition::infer("tier7_vs_tier6"), Condition::FullSystem);
    }
}
