//! Before/after decision windows around a reference event.
//!
//! The live post-death shift and the batch cross-condition tests both go
//! through [`death_window`], so admissibility (at least [`MIN_WINDOW_SIDE`]
//! decisions strictly on each side) is decided in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{BehavioralShift, Decision};
use crate::store::SessionData;

/// Default number of decisions taken on each side of a death.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Windows with fewer decisions than this on either side are skipped.
pub const MIN_WINDOW_SIDE: usize = 5;

/// Decisions immediately preceding and following a reference timestamp.
#[derive(Debug, Clone, Copy)]
pub struct DecisionWindow<'a> {
    pub before: &'a [Decision],
    pub after: &'a [Decision],
}

/// Scalar extracted from a window, per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatistic {
    /// Mean latency, change in ms
    MeanLatency,
    /// Mean latency, change as percent of the before mean
    PercentLatency,
    /// Fraction of decisions below the low-confidence threshold, change in
    /// percentage points
    LowConfidenceFraction,
    /// Mean confidence, change in absolute units
    MeanConfidence,
}

/// One side-by-side reading of a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowReading {
    pub before: f64,
    pub after: f64,
}

/// Select up to `window_size` decisions strictly before `at` and up to
/// `window_size` strictly after it. `decisions` must be timestamp ordered.
///
/// Returns `None` when either side has fewer than [`MIN_WINDOW_SIDE`].
pub fn death_window(
    decisions: &[Decision],
    at: DateTime<Utc>,
    window_size: usize,
) -> Option<DecisionWindow<'_>> {
    let before_end = decisions.partition_point(|d| d.timestamp < at);
    let after_start = decisions.partition_point(|d| d.timestamp <= at);

    let before = &decisions[before_end.saturating_sub(window_size)..before_end];
    let after_end = (after_start + window_size).min(decisions.len());
    let after = &decisions[after_start..after_end];

    if before.len() < MIN_WINDOW_SIDE || after.len() < MIN_WINDOW_SIDE {
        return None;
    }
    Some(DecisionWindow { before, after })
}

impl DecisionWindow<'_> {
    pub fn reading(&self, statistic: WindowStatistic) -> WindowReading {
        let side = |decisions: &[Decision]| match statistic {
            WindowStatistic::MeanLatency | WindowStatistic::PercentLatency => {
                mean_of(decisions, |d| d.latency_ms)
            }
            WindowStatistic::LowConfidenceFraction => low_confidence_fraction(decisions),
            WindowStatistic::MeanConfidence => mean_of(decisions, |d| d.confidence),
        };
        WindowReading {
            before: side(self.before),
            after: side(self.after),
        }
    }

    /// After minus before, in the statistic's own units.
    pub fn change(&self, statistic: WindowStatistic) -> f64 {
        let reading = self.reading(statistic);
        let delta = reading.after - reading.before;
        match statistic {
            WindowStatistic::PercentLatency => {
                if reading.before > 0.0 {
                    delta / reading.before * 100.0
                } else {
                    0.0
                }
            }
            WindowStatistic::LowConfidenceFraction => delta * 100.0,
            WindowStatistic::MeanLatency | WindowStatistic::MeanConfidence => delta,
        }
    }

    /// The three shift fields written onto a death.
    pub fn shift(&self) -> BehavioralShift {
        let latency = self.reading(WindowStatistic::MeanLatency);
        let risk = self.reading(WindowStatistic::LowConfidenceFraction);
        let confidence = self.reading(WindowStatistic::MeanConfidence);
        BehavioralShift {
            latency_increase: latency.after - latency.before,
            risk_aversion_increase: risk.after - risk.before,
            confidence_change: confidence.after - confidence.before,
        }
    }
}

/// One observation per admissible death across every session given.
pub fn collect_observations<'a, I>(sessions: I, statistic: WindowStatistic, window_size: usize) -> Vec<f64>
where
    I: IntoIterator<Item = &'a SessionData>,
{
    admissible_windows(sessions, window_size)
        .map(|window| window.change(statistic))
        .collect()
}

/// Before/after pairs per admissible death, for paired comparisons.
pub fn collect_pairs<'a, I>(sessions: I, statistic: WindowStatistic, window_size: usize) -> Vec<WindowReading>
where
    I: IntoIterator<Item = &'a SessionData>,
{
    admissible_windows(sessions, window_size)
        .map(|window| window.reading(statistic))
        .collect()
}

fn admissible_windows<'a, I>(sessions: I, window_size: usize) -> impl Iterator<Item = DecisionWindow<'a>>
where
    I: IntoIterator<Item = &'a SessionData>,
{
    sessions.into_iter().flat_map(move |session| {
        session
            .deaths
            .iter()
            .filter_map(move |death| death_window(&session.decisions, death.timestamp, window_size))
    })
}

fn mean_of(decisions: &[Decision], value: impl Fn(&Decision) -> f64) -> f64 {
    if decisions.is_empty() {
        return 0.0;
    }
    decisions.iter().map(value).sum::<f64>() / decisions.len() as f64
}

fn low_confidence_fraction(decisions: &[Decision]) -> f64 {
    if decisions.is_empty() {
        return 0.0;
    }
    decisions.iter().filter(|d| d.is_low_confidence()).count() as f64 / decisions.len() as f64
}
