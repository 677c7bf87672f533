use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence below which a decision counts as sub-optimal.
pub const SUB_OPTIMAL_CONFIDENCE: f64 = 0.6;

/// Confidence below which a decision counts as risk-averse in post-death windows.
pub const LOW_CONFIDENCE: f64 = 0.5;

/// Where the agent was when it decided. Free-form tags, no validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Coarse game state tag (e.g. "combat", "exploration", "idle")
    pub game_state: String,
    pub level: u32,
    /// Health as a fraction of maximum
    pub health_fraction: f64,
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self {
            game_state: "unknown".to_string(),
            level: 1,
            health_fraction: 1.0,
        }
    }
}

/// The observed consequence of a decision, attached after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub outcome: String,
    /// Caller contract: within [-1, 1]
    pub valence: f64,
    pub led_to_death: bool,
}

/// A single decision point with its cognitive context.
///
/// All measurements are caller-supplied. Ranges (confidence in [0, 1] and so
/// on) are a contract of the emitting agent and are not checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub context: DecisionContext,
    pub action: String,
    /// Ordered alternatives the agent weighed before acting
    pub alternatives: Vec<String>,
    pub latency_ms: f64,
    pub confidence: f64,
    pub mental_load: f64,
    pub active_ruminations: u32,
    pub intrusive_thought: bool,
    pub dominant_emotion: String,
    pub fatigue: f64,
    /// Unset at creation, see [`Decision::update_outcome`]
    pub outcome: Option<DecisionOutcome>,
}

impl Decision {
    pub fn new(timestamp: DateTime<Utc>, session_id: impl Into<String>, input: DecisionInput) -> Self {
        Self {
            timestamp,
            session_id: session_id.into(),
            context: input.context,
            action: input.action,
            alternatives: input.alternatives,
            latency_ms: input.latency_ms,
            confidence: input.confidence,
            mental_load: input.mental_load,
            active_ruminations: input.active_ruminations,
            intrusive_thought: input.intrusive_thought,
            dominant_emotion: input.dominant_emotion,
            fatigue: input.fatigue,
            outcome: None,
        }
    }

    /// Attach the observed outcome.
    ///
    /// Single-call contract: call once, after the consequence is known.
    /// Calling again overwrites the earlier outcome (last write wins).
    pub fn update_outcome(&mut self, outcome: impl Into<String>, valence: f64, led_to_death: bool) {
        self.outcome = Some(DecisionOutcome {
            outcome: outcome.into(),
            valence,
            led_to_death,
        });
    }

    pub fn is_sub_optimal(&self) -> bool {
        self.confidence < SUB_OPTIMAL_CONFIDENCE
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE
    }
}

/// A single rumination activation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rumination {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// e.g. "REGRET_SPIRAL", "COUNTERFACTUAL"
    pub rumination_type: String,
    pub content: String,
    pub emotional_intensity: f64,
    pub intrusion_frequency: f64,
    /// What set it off: "death", "combat", "idle", "memory"
    pub triggered_by: String,
    pub game_state: String,
    pub load_contribution: f64,
    pub decision_bias: f64,
    /// Whether a meta-cognitive suppression attempt targeted this thought.
    /// `None` when the emitting configuration has no suppression at all.
    pub suppressed: Option<bool>,
}

impl Rumination {
    pub fn new(timestamp: DateTime<Utc>, session_id: impl Into<String>, input: RuminationInput) -> Self {
        Self {
            timestamp,
            session_id: session_id.into(),
            rumination_type: input.rumination_type,
            content: input.content,
            emotional_intensity: input.emotional_intensity,
            intrusion_frequency: input.intrusion_frequency,
            triggered_by: input.triggered_by,
            game_state: input.game_state,
            load_contribution: input.load_contribution,
            decision_bias: input.decision_bias,
            suppressed: input.suppressed,
        }
    }
}

/// Change in behavior over the decisions following a death, as after - before.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehavioralShift {
    /// Mean decision latency change (ms)
    pub latency_increase: f64,
    /// Change in the fraction of low-confidence decisions
    pub risk_aversion_increase: f64,
    /// Mean confidence change
    pub confidence_change: f64,
}

/// An agent death and its psychological aftermath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Death {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub level: u32,
    pub cause: String,
    pub location: String,
    /// Action tags of the decisions leading up to the death
    pub pre_death_decisions: Vec<String>,
    pub pre_death_confidence: f64,
    pub ruminations_triggered: u32,
    pub counterfactuals_generated: u32,
    pub regret_intensity: f64,
    /// Unset until a post-death shift computation finds enough decisions
    pub shift: Option<BehavioralShift>,
}

impl Death {
    pub fn new(timestamp: DateTime<Utc>, session_id: impl Into<String>, input: DeathInput) -> Self {
        Self {
            timestamp,
            session_id: session_id.into(),
            level: input.level,
            cause: input.cause,
            location: input.location,
            pre_death_decisions: input.pre_death_decisions,
            pre_death_confidence: input.pre_death_confidence,
            ruminations_triggered: input.ruminations_triggered,
            counterfactuals_generated: input.counterfactuals_generated,
            regret_intensity: input.regret_intensity,
            shift: None,
        }
    }

    /// A death counts as regretted when it triggered at least one rumination.
    pub fn has_regret(&self) -> bool {
        self.ruminations_triggered > 0
    }
}

/// Caller-facing measurements for a decision. Timestamp and session are
/// supplied by the session log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub context: DecisionContext,
    pub action: String,
    pub alternatives: Vec<String>,
    pub latency_ms: f64,
    pub confidence: f64,
    pub mental_load: f64,
    pub active_ruminations: u32,
    pub intrusive_thought: bool,
    pub dominant_emotion: String,
    pub fatigue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuminationInput {
    pub rumination_type: String,
    pub content: String,
    pub emotional_intensity: f64,
    pub intrusion_frequency: f64,
    pub triggered_by: String,
    pub game_state: String,
    pub load_contribution: f64,
    pub decision_bias: f64,
    pub suppressed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeathInput {
    pub level: u32,
    pub cause: String,
    pub location: String,
    pub pre_death_decisions: Vec<String>,
    pub pre_death_confidence: f64,
    pub ruminations_triggered: u32,
    pub counterfactuals_generated: u32,
    pub regret_intensity: f64,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Death, DeathInput, Decision, DecisionInput};

    #[test]
    fn decision_outcome_starts_unset_and_is_written_by_update() {
        let mut decision = Decision::new(Utc::now(), "tier6_run1", DecisionInput::default());
        assert!(decision.outcome.is_none());

        decision.update_outcome("survived", 0.4, false);
        let outcome = decision.outcome.as_ref().expect("outcome set");
        assert_eq!(outcome.outcome, "survived");
        assert_eq!(outcome.valence, 0.4);
        assert!(!outcome.led_to_death);
    }

    #[test]
    fn repeated_outcome_update_keeps_last_write() {
        let mut decision = Decision::new(Utc::now(), "s", DecisionInput::default());
        decision.update_outcome("survived", 0.4, false);
        decision.update_outcome("died", -1.0, true);
        let outcome = decision.outcome.expect("outcome set");
        assert_eq!(outcome.outcome, "died");
        assert!(outcome.led_to_death);
    }

    #[test]
    fn confidence_thresholds_are_strict() {
        let mut input = DecisionInput::default();
        input.confidence = 0.6;
        let at_threshold = Decision::new(Utc::now(), "s", input.clone());
        assert!(!at_threshold.is_sub_optimal());
        assert!(!at_threshold.is_low_confidence());

        input.confidence = 0.45;
        let low = Decision::new(Utc::now(), "s", input);
        assert!(low.is_sub_optimal());
        assert!(low.is_low_confidence());
    }

    #[test]
    fn death_regret_requires_a_triggered_rumination() {
        let mut input = DeathInput::default();
        let quiet = Death::new(Utc::now(), "s", input.clone());
        assert!(!quiet.has_regret());
        assert!(quiet.shift.is_none());

        input.ruminations_triggered = 1;
        assert!(Death::new(Utc::now(), "s", input).has_regret());
    }
}
