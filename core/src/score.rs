use serde::{Deserialize, Serialize};

use crate::events::{Death, Decision};

/// Sessions with fewer decisions than this score 0.
pub const MIN_DECISIONS_FOR_SCORE: usize = 10;

/// Latency above this multiple of the median counts as analysis paralysis.
pub const PARALYSIS_LATENCY_FACTOR: f64 = 2.0;

pub const WEIGHT_RUMINATION: f64 = 0.25;
pub const WEIGHT_SUB_OPTIMAL: f64 = 0.25;
pub const WEIGHT_REGRET: f64 = 0.20;
pub const WEIGHT_PARALYSIS: f64 = 0.15;
pub const WEIGHT_INTRUSIVE: f64 = 0.15;

/// Event counts the composite score is computed from.
///
/// The live session log, the summary builder and the batch analyzer all build
/// this through [`BehaviorMetrics::from_streams`] and score it through
/// [`human_likeness`], so the formula exists exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorMetrics {
    pub decisions: usize,
    pub ruminations: usize,
    pub deaths: usize,
    pub deaths_with_regret: usize,
    pub sub_optimal_decisions: usize,
    pub paralysis_decisions: usize,
    pub intrusive_decisions: usize,
}

impl BehaviorMetrics {
    pub fn from_streams(decisions: &[Decision], rumination_count: usize, deaths: &[Death]) -> Self {
        Self {
            decisions: decisions.len(),
            ruminations: rumination_count,
            deaths: deaths.len(),
            deaths_with_regret: deaths.iter().filter(|d| d.has_regret()).count(),
            sub_optimal_decisions: decisions.iter().filter(|d| d.is_sub_optimal()).count(),
            paralysis_decisions: count_paralysis(decisions),
            intrusive_decisions: decisions.iter().filter(|d| d.intrusive_thought).count(),
        }
    }

    pub fn rumination_rate(&self) -> f64 {
        (2.0 * ratio(self.ruminations, self.decisions)).min(1.0)
    }

    pub fn sub_optimal_rate(&self) -> f64 {
        ratio(self.sub_optimal_decisions, self.decisions)
    }

    pub fn regret_rate(&self) -> f64 {
        ratio(self.deaths_with_regret, self.deaths)
    }

    /// Zero below [`MIN_DECISIONS_FOR_SCORE`] decisions.
    pub fn paralysis_rate(&self) -> f64 {
        if self.decisions < MIN_DECISIONS_FOR_SCORE {
            return 0.0;
        }
        ratio(self.paralysis_decisions, self.decisions)
    }

    pub fn intrusive_rate(&self) -> f64 {
        ratio(self.intrusive_decisions, self.decisions)
    }
}

/// Composite human-likeness score in [0, 1].
///
/// Higher means more ruminative, hesitant and emotionally driven behavior.
pub fn human_likeness(metrics: &BehaviorMetrics) -> f64 {
    if metrics.decisions < MIN_DECISIONS_FOR_SCORE {
        return 0.0;
    }

    let score = metrics.rumination_rate() * WEIGHT_RUMINATION
        + metrics.sub_optimal_rate() * WEIGHT_SUB_OPTIMAL
        + metrics.regret_rate() * WEIGHT_REGRET
        + metrics.paralysis_rate() * WEIGHT_PARALYSIS
        + metrics.intrusive_rate() * WEIGHT_INTRUSIVE;

    score.clamp(0.0, 1.0)
}

/// Upper median (`sorted[n / 2]`), `None` for an empty slice.
pub fn upper_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[sorted.len() / 2])
}

/// Decisions whose latency exceeds twice the session's median latency.
pub fn count_paralysis(decisions: &[Decision]) -> usize {
    let latencies: Vec<f64> = decisions.iter().map(|d| d.latency_ms).collect();
    let Some(median) = upper_median(&latencies) else {
        return 0;
    };
    let threshold = median * PARALYSIS_LATENCY_FACTOR;
    latencies.iter().filter(|&&l| l > threshold).count()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{BehaviorMetrics, count_paralysis, human_likeness, upper_median};
    use crate::events::{Decision, DecisionInput};

    fn decisions(latencies: &[f64], confidence: f64) -> Vec<Decision> {
        let start = Utc::now();
        latencies
            .iter()
            .enumerate()
            .map(|(i, &latency_ms)| {
                Decision::new(
                    start + Duration::seconds(i as i64),
                    "s",
                    DecisionInput {
                        latency_ms,
                        confidence,
                        ..DecisionInput::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn fewer_than_ten_decisions_scores_zero() {
        let metrics = BehaviorMetrics {
            decisions: 9,
            ruminations: 9,
            sub_optimal_decisions: 9,
            intrusive_decisions: 9,
            ..BehaviorMetrics::default()
        };
        assert_eq!(human_likeness(&metrics), 0.0);
    }

    #[test]
    fn saturated_metrics_clip_to_one() {
        let metrics = BehaviorMetrics {
            decisions: 10,
            ruminations: 100,
            deaths: 2,
            deaths_with_regret: 2,
            sub_optimal_decisions: 10,
            paralysis_decisions: 10,
            intrusive_decisions: 10,
        };
        assert!((human_likeness(&metrics) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weights_combine_sub_metrics() {
        let metrics = BehaviorMetrics {
            decisions: 20,
            ruminations: 5,             // rate min(1, 0.5) = 0.5
            deaths: 4,
            deaths_with_regret: 1,      // 0.25
            sub_optimal_decisions: 10,  // 0.5
            paralysis_decisions: 2,     // 0.1
            intrusive_decisions: 4,     // 0.2
        };
        let expected = 0.5 * 0.25 + 0.5 * 0.25 + 0.25 * 0.20 + 0.1 * 0.15 + 0.2 * 0.15;
        assert!((human_likeness(&metrics) - expected).abs() < 1e-12);
    }

    #[test]
    fn no_deaths_means_zero_regret() {
        let metrics = BehaviorMetrics {
            decisions: 12,
            ..BehaviorMetrics::default()
        };
        assert_eq!(metrics.regret_rate(), 0.0);
        assert_eq!(human_likeness(&metrics), 0.0);
    }

    #[test]
    fn upper_median_picks_the_higher_middle_value() {
        assert_eq!(upper_median(&[]), None);
        assert_eq!(upper_median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(upper_median(&[4.0, 1.0, 3.0, 2.0]), Some(3.0));
    }

    #[test]
    fn paralysis_counts_latency_above_twice_median() {
        let stream = decisions(&[100.0, 100.0, 100.0, 100.0, 201.0, 500.0], 0.9);
        assert_eq!(count_paralysis(&stream), 2);
    }

    #[test]
    fn metrics_from_streams_count_thresholds() {
        let mut stream = decisions(&[100.0; 10], 0.55);
        stream[0].intrusive_thought = true;
        let metrics = BehaviorMetrics::from_streams(&stream, 3, &[]);
        assert_eq!(metrics.decisions, 10);
        assert_eq!(metrics.ruminations, 3);
        assert_eq!(metrics.sub_optimal_decisions, 10);
        assert_eq!(metrics.intrusive_decisions, 1);
        assert_eq!(metrics.paralysis_decisions, 0);
        let score = human_likeness(&metrics);
        assert!((0.0..=1.0).contains(&score));
    }
}
