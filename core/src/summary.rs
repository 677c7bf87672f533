use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{Death, Decision, Rumination};
use crate::score::{BehaviorMetrics, human_likeness};

/// How many dominant emotions a summary lists.
const DOMINANT_EMOTION_LIMIT: usize = 3;

/// Aggregate statistics over a session's full event streams.
///
/// Always derived: rebuild it from the streams, never edit it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    pub total_decisions: usize,
    pub total_deaths: usize,
    pub total_ruminations: usize,
    pub levels_gained: u32,

    pub avg_mental_load: f64,
    pub avg_decision_latency_ms: f64,
    pub avg_confidence: f64,
    pub total_counterfactuals: u64,

    pub sub_optimal_decisions: usize,
    pub sub_optimal_decision_rate: f64,
    pub deaths_with_regret: usize,
    pub post_death_regret_rate: f64,
    pub analysis_paralysis_events: usize,
    pub intrusive_decisions: usize,
    pub intrusive_thought_rate: f64,
    pub human_likeness_score: f64,

    /// Most frequent dominant-emotion tags, most common first
    pub dominant_emotions: Vec<String>,
}

impl SessionSummary {
    pub fn from_streams(
        session_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        decisions: &[Decision],
        ruminations: &[Rumination],
        deaths: &[Death],
    ) -> Self {
        let metrics = BehaviorMetrics::from_streams(decisions, ruminations.len(), deaths);

        let levels_gained = match (
            decisions.iter().map(|d| d.context.level).min(),
            decisions.iter().map(|d| d.context.level).max(),
        ) {
            (Some(low), Some(high)) => high - low,
            _ => 0,
        };

        Self {
            session_id: session_id.into(),
            start_time,
            end_time,
            total_decisions: metrics.decisions,
            total_deaths: metrics.deaths,
            total_ruminations: metrics.ruminations,
            levels_gained,
            avg_mental_load: mean(decisions.iter().map(|d| d.mental_load)),
            avg_decision_latency_ms: mean(decisions.iter().map(|d| d.latency_ms)),
            avg_confidence: mean(decisions.iter().map(|d| d.confidence)),
            total_counterfactuals: deaths.iter().map(|d| u64::from(d.counterfactuals_generated)).sum(),
            sub_optimal_decisions: metrics.sub_optimal_decisions,
            sub_optimal_decision_rate: metrics.sub_optimal_rate(),
            deaths_with_regret: metrics.deaths_with_regret,
            post_death_regret_rate: metrics.regret_rate(),
            analysis_paralysis_events: metrics.paralysis_decisions,
            intrusive_decisions: metrics.intrusive_decisions,
            intrusive_thought_rate: metrics.intrusive_rate(),
            human_likeness_score: human_likeness(&metrics),
            dominant_emotions: dominant_emotions(decisions),
        }
    }

    /// Counts the composite score is computed from.
    pub fn metrics(&self) -> BehaviorMetrics {
        BehaviorMetrics {
            decisions: self.total_decisions,
            ruminations: self.total_ruminations,
            deaths: self.total_deaths,
            deaths_with_regret: self.deaths_with_regret,
            sub_optimal_decisions: self.sub_optimal_decisions,
            paralysis_decisions: self.analysis_paralysis_events,
            intrusive_decisions: self.intrusive_decisions,
        }
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 3_600_000.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Ties break alphabetically so the list is stable across runs.
fn dominant_emotions(decisions: &[Decision]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for decision in decisions {
        if !decision.dominant_emotion.is_empty() {
            *counts.entry(decision.dominant_emotion.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(DOMINANT_EMOTION_LIMIT)
        .map(|(emotion, _)| emotion.to_string())
        .collect()
}
