//! Capability presets for the experimental arms and batch id generation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

pub const DEFAULT_DATA_DIR: &str = "research_data";

/// Which cognitive capabilities an agent run has enabled.
///
/// Beliefs, drives, memory and emotions are on in every preset; the arms
/// differ in personality, rumination and meta-cognition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub enable_beliefs: bool,
    pub enable_drives: bool,
    pub enable_memory: bool,
    pub enable_emotions: bool,
    pub enable_personality: bool,
    pub enable_rumination: bool,
    pub enable_meta_cognition: bool,

    pub enable_behavioral_logging: bool,
    pub session_id: String,
    pub data_dir: PathBuf,
    pub condition: Condition,
    pub random_seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            enable_beliefs: true,
            enable_drives: true,
            enable_memory: true,
            enable_emotions: true,
            enable_personality: true,
            enable_rumination: true,
            enable_meta_cognition: true,
            enable_behavioral_logging: false,
            session_id: "default".to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            condition: Condition::Unknown,
            random_seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Everything on.
    pub fn tier7_full(session_id: Option<String>) -> Self {
        Self::preset(Condition::FullSystem, session_id, "tier7_full")
    }

    /// Rumination without meta-cognition: control arm for full-system effects.
    pub fn tier6_baseline(session_id: Option<String>) -> Self {
        Self {
            enable_meta_cognition: false,
            ..Self::preset(Condition::NoMetaCognition, session_id, "tier6_baseline")
        }
    }

    /// Personality and emotion, no rumination: control arm for rumination effects.
    pub fn tier5_baseline(session_id: Option<String>) -> Self {
        Self {
            enable_rumination: false,
            enable_meta_cognition: false,
            ..Self::preset(Condition::NoRumination, session_id, "tier5_baseline")
        }
    }

    /// Beliefs and drives only, pure performance.
    pub fn optimal_agent(session_id: Option<String>) -> Self {
        Self {
            enable_personality: false,
            enable_rumination: false,
            enable_meta_cognition: false,
            ..Self::preset(Condition::OptimalBaseline, session_id, "optimal_baseline")
        }
    }

    /// Preset for a known condition; `None` for [`Condition::Unknown`].
    pub fn for_condition(condition: Condition, session_id: Option<String>) -> Option<Self> {
        match condition {
            Condition::FullSystem => Some(Self::tier7_full(session_id)),
            Condition::NoMetaCognition => Some(Self::tier6_baseline(session_id)),
            Condition::NoRumination => Some(Self::tier5_baseline(session_id)),
            Condition::OptimalBaseline => Some(Self::optimal_agent(session_id)),
            Condition::Unknown => None,
        }
    }

    fn preset(condition: Condition, session_id: Option<String>, default_id: &str) -> Self {
        Self {
            enable_behavioral_logging: true,
            session_id: session_id.unwrap_or_else(|| default_id.to_string()),
            condition,
            ..Self::default()
        }
    }

    pub fn rumination_active(&self) -> bool {
        self.enable_rumination
    }

    /// Meta-cognition regulates rumination, so it needs rumination enabled.
    pub fn meta_cognition_active(&self) -> bool {
        self.enable_meta_cognition && self.enable_rumination
    }

    /// Enabled capability names, lowest first.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut enabled = Vec::new();
        if self.enable_beliefs && self.enable_drives {
            enabled.push("beliefs+drives");
        }
        if self.enable_memory {
            enabled.push("memory");
        }
        if self.enable_emotions {
            enabled.push("emotions");
        }
        if self.enable_personality {
            enabled.push("personality");
        }
        if self.rumination_active() {
            enabled.push("rumination");
        }
        if self.meta_cognition_active() {
            enabled.push("meta-cognition");
        }
        enabled
    }

    pub fn summary_line(&self) -> String {
        format!("{}: {}", self.condition.label(), self.capabilities().join(", "))
    }
}

/// Arms run in a standard comparison batch.
pub const BATCH_CONDITIONS: [Condition; 3] = [
    Condition::FullSystem,
    Condition::NoMetaCognition,
    Condition::NoRumination,
];

/// `runs` configurations per batch arm, ids `{base}_{tag}_run{NN}`.
///
/// Ids carry the condition tag, so persisted sessions classify back into the
/// arm that produced them.
pub fn create_experiment_batch(base_session_id: &str, runs: usize) -> BTreeMap<Condition, Vec<ExperimentConfig>> {
    let mut batch = BTreeMap::new();
    for condition in BATCH_CONDITIONS {
        let configs = (0..runs)
            .filter_map(|run| {
                let id = format!("{base_session_id}_{}_run{run:02}", condition.tag());
                ExperimentConfig::for_condition(condition, Some(id))
            })
            .collect();
        batch.insert(condition, configs);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::{ExperimentConfig, create_experiment_batch};
    use crate::condition::Condition;

    #[test]
    fn presets_toggle_the_documented_capabilities() {
        let full = ExperimentConfig::tier7_full(None);
        assert!(full.meta_cognition_active());
        assert_eq!(full.session_id, "tier7_full");

        let tier6 = ExperimentConfig::tier6_baseline(None);
        assert!(tier6.rumination_active());
        assert!(!tier6.meta_cognition_active());

        let tier5 = ExperimentConfig::tier5_baseline(Some("custom".to_string()));
        assert!(!tier5.rumination_active());
        assert!(tier5.enable_personality);
        assert_eq!(tier5.session_id, "custom");

        let optimal = ExperimentConfig::optimal_agent(None);
        assert_eq!(optimal.capabilities(), vec!["beliefs+drives", "memory", "emotions"]);
        assert_eq!(
            optimal.summary_line(),
            "optimal baseline: beliefs+drives, memory, emotions"
        );
    }

    #[test]
    fn meta_cognition_requires_rumination() {
        let config = ExperimentConfig {
            enable_rumination: false,
            ..ExperimentConfig::default()
        };
        assert!(config.enable_meta_cognition);
        assert!(!config.meta_cognition_active());
    }

    #[test]
    fn batch_ids_classify_back_into_their_arm() {
        let batch = create_experiment_batch("exp", 3);
        assert_eq!(batch.len(), 3);
        for (condition, configs) in &batch {
            assert_eq!(configs.len(), 3);
            for config in configs {
                assert_eq!(Condition::infer(&config.session_id), *condition);
                assert_eq!(config.condition, *condition);
            }
        }
        assert_eq!(batch[&Condition::FullSystem][2].session_id, "exp_tier7_run02");
    }

    #[test]
    fn unknown_condition_has_no_preset() {
        assert!(ExperimentConfig::for_condition(Condition::Unknown, None).is_none());
    }
}
