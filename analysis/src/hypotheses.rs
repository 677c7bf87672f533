//! Hypothesis catalog.
//!
//! Every entry has the same shape: pick the condition groups it compares,
//! derive one sample per group, run one procedure, compute an effect size and
//! decide `supported = p < alpha && effect rule`. New entries implement
//! [`Hypothesis`]; the built-in ones are data-driven [`CatalogEntry`] values.

use std::collections::BTreeMap;
use std::fmt;

use hec_core::condition::Condition;
use hec_core::store::SessionData;
use hec_core::window::{DEFAULT_WINDOW_SIZE, WindowStatistic, collect_observations, collect_pairs};
use serde::Serialize;
use thiserror::Error;

use crate::stats::{
    AnovaResult, ChiSquareResult, CorrelationResult, PairedTResult, StatsError, TTestResult, chi_square_2x2,
    describe, independent_t_test, one_way_anova, paired_t_test, pearson,
};

/// Bonferroni-corrected significance threshold.
pub const ALPHA: f64 = 0.005;

/// Conditions need this many sessions to take part in the one-way comparison.
pub const MIN_SESSIONS_PER_GROUP: usize = 2;

/// The one-way comparison needs this many qualifying conditions.
pub const MIN_GROUPS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub window_size: usize,
    pub alpha: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            alpha: ALPHA,
        }
    }
}

/// Loaded sessions grouped by condition, plus tunables.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub groups: &'a BTreeMap<Condition, Vec<SessionData>>,
    pub config: AnalysisConfig,
}

impl<'a> AnalysisInput<'a> {
    pub fn new(groups: &'a BTreeMap<Condition, Vec<SessionData>>, config: AnalysisConfig) -> Self {
        Self { groups, config }
    }

    /// Sessions of one condition; empty when none loaded.
    pub fn sessions(&self, condition: Condition) -> &'a [SessionData] {
        self.groups.get(&condition).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Error)]
pub enum HypothesisError {
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error("{0} has a zero baseline mean; percent change is undefined")]
    ZeroBaseline(String),
    #[error("needs {required} conditions with at least two sessions each, found {available}")]
    InsufficientGroups { required: usize, available: usize },
}

/// Minimum effect magnitude, in the effect's own direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum EffectRule {
    AtLeast(f64),
    AtMost(f64),
}

impl EffectRule {
    pub fn holds(self, value: f64) -> bool {
        match self {
            Self::AtLeast(threshold) => value >= threshold,
            Self::AtMost(threshold) => value <= threshold,
        }
    }
}

impl fmt::Display for EffectRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast(threshold) => write!(f, ">= {threshold}"),
            Self::AtMost(threshold) => write!(f, "<= {threshold}"),
        }
    }
}

/// Output of the procedure a hypothesis ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "procedure", rename_all = "snake_case")]
pub enum TestStatistics {
    IndependentT(TTestResult),
    PairedT(PairedTResult),
    Pearson(CorrelationResult),
    ChiSquare(ChiSquareResult),
    Anova(AnovaResult),
}

impl TestStatistics {
    pub fn p_value(&self) -> f64 {
        match self {
            Self::IndependentT(r) => r.p,
            Self::PairedT(r) => r.p,
            Self::Pearson(r) => r.p,
            Self::ChiSquare(r) => r.p,
            Self::Anova(r) => r.p,
        }
    }

    /// Literal statistics line, e.g. `t = 2.31, p = 0.0040, d = 0.74`.
    pub fn render(&self) -> String {
        match self {
            Self::IndependentT(r) => format!("t({:.0}) = {:.2}, p = {:.4}, d = {:.2}", r.df, r.t, r.p, r.cohens_d),
            Self::PairedT(r) => format!("t({:.0}) = {:.2}, p = {:.4}, d_z = {:.2}", r.df, r.t, r.p, r.d_z),
            Self::Pearson(r) => format!("r = {:.2}, p = {:.4}, n = {}", r.r, r.p, r.n),
            Self::ChiSquare(r) => format!("χ²(1) = {:.2}, p = {:.4}, φ = {:.2}", r.chi_square, r.p, r.phi),
            Self::Anova(r) => format!(
                "F({:.0}, {:.0}) = {:.2}, p = {:.4}, η² = {:.2}",
                r.df_between, r.df_within, r.f, r.p, r.eta_squared
            ),
        }
    }
}

/// Named effect value the rule is checked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub name: &'static str,
    pub value: f64,
}

/// Size and mean of one derived sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    pub label: String,
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
}

impl SampleSummary {
    fn of(label: impl Into<String>, values: &[f64]) -> Self {
        let d = describe(values);
        Self {
            label: label.into(),
            n: d.n,
            mean: d.mean,
            sd: d.sd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisResult {
    pub id: String,
    pub title: String,
    pub statement: String,
    pub samples: Vec<SampleSummary>,
    pub statistics: TestStatistics,
    pub effect: Effect,
    pub rule: EffectRule,
    pub alpha: f64,
    pub supported: bool,
}

pub trait Hypothesis {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn statement(&self) -> &str;
    fn evaluate(&self, input: &AnalysisInput<'_>) -> Result<HypothesisResult, HypothesisError>;
}

/// Per-session scalar for session-level comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMetric {
    SubOptimalRate,
    IntrusiveRate,
    MeanMentalLoad,
    HumanLikeness,
}

impl SessionMetric {
    /// `None` for sessions without decisions.
    pub fn value(self, session: &SessionData) -> Option<f64> {
        if session.decisions.is_empty() {
            return None;
        }
        let metrics = session.metrics();
        Some(match self {
            Self::SubOptimalRate => metrics.sub_optimal_rate(),
            Self::IntrusiveRate => metrics.intrusive_rate(),
            Self::MeanMentalLoad => {
                session.decisions.iter().map(|d| d.mental_load).sum::<f64>() / session.decisions.len() as f64
            }
            Self::HumanLikeness => hec_core::score::human_likeness(&metrics),
        })
    }

    fn collect(self, sessions: &[SessionData]) -> Vec<f64> {
        sessions.iter().filter_map(|s| self.value(s)).collect()
    }
}

/// How an entry derives its samples and which procedure it runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    /// One post-death window change per death, two conditions, independent t
    WindowChange {
        statistic: WindowStatistic,
        group: Condition,
        control: Condition,
    },
    /// Before and after reading per death within one condition, paired t
    WindowPairs {
        statistic: WindowStatistic,
        group: Condition,
    },
    /// Mental load against confidence over every decision of a condition
    LoadConfidenceCorrelation { group: Condition },
    /// Deaths with and without a triggered rumination, 2x2 chi-square
    RegretContingency { group: Condition, control: Condition },
    /// One value per session, two conditions, independent t
    PerSession {
        metric: SessionMetric,
        group: Condition,
        control: Condition,
    },
    /// Intrusion frequency of suppressed against non-suppressed ruminations,
    /// effect as percent increase
    SuppressionParadox { group: Condition },
    /// One value per session across every qualifying known condition, ANOVA
    AcrossConditions { metric: SessionMetric },
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub statement: &'static str,
    pub comparison: Comparison,
    pub rule: EffectRule,
}

impl Hypothesis for CatalogEntry {
    fn id(&self) -> &str {
        self.id
    }

    fn title(&self) -> &str {
        self.title
    }

    fn statement(&self) -> &str {
        self.statement
    }

    fn evaluate(&self, input: &AnalysisInput<'_>) -> Result<HypothesisResult, HypothesisError> {
        let window_size = input.config.window_size;
        let (samples, statistics, effect) = match self.comparison {
            Comparison::WindowChange {
                statistic,
                group,
                control,
            } => {
                let a = collect_observations(input.sessions(group), statistic, window_size);
                let b = collect_observations(input.sessions(control), statistic, window_size);
                two_groups(group, &a, control, &b)?
            }
            Comparison::WindowPairs { statistic, group } => {
                let pairs = collect_pairs(input.sessions(group), statistic, window_size);
                let before: Vec<f64> = pairs.iter().map(|p| p.before).collect();
                let after: Vec<f64> = pairs.iter().map(|p| p.after).collect();
                let result = paired_t_test(&before, &after)?;
                (
                    vec![
                        SampleSummary::of(format!("{} before death", group.tag()), &before),
                        SampleSummary::of(format!("{} after death", group.tag()), &after),
                    ],
                    TestStatistics::PairedT(result),
                    Effect {
                        name: "d_z",
                        value: result.d_z,
                    },
                )
            }
            Comparison::LoadConfidenceCorrelation { group } => {
                let decisions = input.sessions(group).iter().flat_map(|s| s.decisions.iter());
                let (load, confidence): (Vec<f64>, Vec<f64>) =
                    decisions.map(|d| (d.mental_load, d.confidence)).unzip();
                let result = pearson(&load, &confidence)?;
                (
                    vec![
                        SampleSummary::of(format!("{} mental load", group.tag()), &load),
                        SampleSummary::of(format!("{} confidence", group.tag()), &confidence),
                    ],
                    TestStatistics::Pearson(result),
                    Effect {
                        name: "r",
                        value: result.r,
                    },
                )
            }
            Comparison::RegretContingency { group, control } => {
                let row = |condition: Condition| {
                    let deaths = input.sessions(condition).iter().flat_map(|s| s.deaths.iter());
                    let (mut regret, mut quiet) = (0u64, 0u64);
                    for death in deaths {
                        if death.has_regret() {
                            regret += 1;
                        } else {
                            quiet += 1;
                        }
                    }
                    [regret, quiet]
                };
                let table = [row(group), row(control)];
                let result = chi_square_2x2(table)?;
                let indicator = |[regret, quiet]: [u64; 2]| -> Vec<f64> {
                    std::iter::repeat_n(1.0, regret as usize)
                        .chain(std::iter::repeat_n(0.0, quiet as usize))
                        .collect()
                };
                (
                    vec![
                        SampleSummary::of(format!("{} deaths with regret", group.tag()), &indicator(table[0])),
                        SampleSummary::of(format!("{} deaths with regret", control.tag()), &indicator(table[1])),
                    ],
                    TestStatistics::ChiSquare(result),
                    Effect {
                        name: "phi",
                        value: result.phi,
                    },
                )
            }
            Comparison::PerSession {
                metric,
                group,
                control,
            } => {
                let a = metric.collect(input.sessions(group));
                let b = metric.collect(input.sessions(control));
                two_groups(group, &a, control, &b)?
            }
            Comparison::SuppressionParadox { group } => {
                let ruminations = input.sessions(group).iter().flat_map(|s| s.ruminations.iter());
                let (mut suppressed, mut free) = (Vec::new(), Vec::new());
                for rumination in ruminations {
                    match rumination.suppressed {
                        Some(true) => suppressed.push(rumination.intrusion_frequency),
                        Some(false) => free.push(rumination.intrusion_frequency),
                        None => {}
                    }
                }
                let result = independent_t_test(&suppressed, &free)?;
                if result.b.mean <= 0.0 {
                    return Err(HypothesisError::ZeroBaseline(format!(
                        "{} non-suppressed intrusion frequency",
                        group.tag()
                    )));
                }
                (
                    vec![
                        SampleSummary::of(format!("{} suppressed", group.tag()), &suppressed),
                        SampleSummary::of(format!("{} not suppressed", group.tag()), &free),
                    ],
                    TestStatistics::IndependentT(result),
                    Effect {
                        name: "percent increase",
                        value: (result.a.mean - result.b.mean) / result.b.mean * 100.0,
                    },
                )
            }
            Comparison::AcrossConditions { metric } => {
                let (labels, groups): (Vec<Condition>, Vec<Vec<f64>>) = Condition::KNOWN
                    .iter()
                    .filter_map(|&condition| {
                        let values = metric.collect(input.sessions(condition));
                        (values.len() >= MIN_SESSIONS_PER_GROUP).then_some((condition, values))
                    })
                    .unzip();
                if groups.len() < MIN_GROUPS {
                    return Err(HypothesisError::InsufficientGroups {
                        required: MIN_GROUPS,
                        available: groups.len(),
                    });
                }
                let result = one_way_anova(&groups)?;
                let samples = labels
                    .iter()
                    .zip(&groups)
                    .map(|(condition, values)| SampleSummary::of(condition.tag(), values))
                    .collect();
                let eta_squared = result.eta_squared;
                (
                    samples,
                    TestStatistics::Anova(result),
                    Effect {
                        name: "eta squared",
                        value: eta_squared,
                    },
                )
            }
        };

        let alpha = input.config.alpha;
        let supported = statistics.p_value() < alpha && self.rule.holds(effect.value);
        Ok(HypothesisResult {
            id: self.id.to_string(),
            title: self.title.to_string(),
            statement: self.statement.to_string(),
            samples,
            statistics,
            effect,
            rule: self.rule,
            alpha,
            supported,
        })
    }
}

fn two_groups(
    group: Condition,
    a: &[f64],
    control: Condition,
    b: &[f64],
) -> Result<(Vec<SampleSummary>, TestStatistics, Effect), HypothesisError> {
    let result = independent_t_test(a, b)?;
    Ok((
        vec![SampleSummary::of(group.tag(), a), SampleSummary::of(control.tag(), b)],
        TestStatistics::IndependentT(result),
        Effect {
            name: "d",
            value: result.cohens_d,
        },
    ))
}

/// The ten built-in hypotheses, in report order.
pub fn default_catalog() -> Vec<Box<dyn Hypothesis>> {
    use Condition::{FullSystem, NoMetaCognition, NoRumination};

    let entries = vec![
        CatalogEntry {
            id: "H6.1",
            title: "Post-death decision latency",
            statement: "Agents with rumination slow down more after a death than agents without it.",
            comparison: Comparison::WindowChange {
                statistic: WindowStatistic::PercentLatency,
                group: NoMetaCognition,
                control: NoRumination,
            },
            rule: EffectRule::AtLeast(0.5),
        },
        CatalogEntry {
            id: "H6.2",
            title: "Post-death risk aversion",
            statement: "Agents with rumination make more low-confidence decisions after a death.",
            comparison: Comparison::WindowChange {
                statistic: WindowStatistic::LowConfidenceFraction,
                group: NoMetaCognition,
                control: NoRumination,
            },
            rule: EffectRule::AtLeast(0.5),
        },
        CatalogEntry {
            id: "H6.3",
            title: "Within-agent latency shift",
            statement: "Ruminating agents decide more slowly after a death than before it.",
            comparison: Comparison::WindowPairs {
                statistic: WindowStatistic::MeanLatency,
                group: NoMetaCognition,
            },
            rule: EffectRule::AtLeast(0.5),
        },
        CatalogEntry {
            id: "H6.4",
            title: "Mental load erodes confidence",
            statement: "Higher mental load goes with lower decision confidence in ruminating agents.",
            comparison: Comparison::LoadConfidenceCorrelation { group: NoMetaCognition },
            rule: EffectRule::AtMost(-0.3),
        },
        CatalogEntry {
            id: "H6.5",
            title: "Post-death regret",
            statement: "Deaths of ruminating agents trigger rumination more often.",
            comparison: Comparison::RegretContingency {
                group: NoMetaCognition,
                control: NoRumination,
            },
            rule: EffectRule::AtLeast(0.3),
        },
        CatalogEntry {
            id: "H6.6",
            title: "Sub-optimal decisions",
            statement: "Ruminating agents make a larger share of low-confidence decisions per session.",
            comparison: Comparison::PerSession {
                metric: SessionMetric::SubOptimalRate,
                group: NoMetaCognition,
                control: NoRumination,
            },
            rule: EffectRule::AtLeast(0.8),
        },
        CatalogEntry {
            id: "H7.1",
            title: "Suppression paradox",
            statement: "Suppressed thoughts intrude at least 30% more often than thoughts left alone.",
            comparison: Comparison::SuppressionParadox { group: FullSystem },
            rule: EffectRule::AtLeast(30.0),
        },
        CatalogEntry {
            id: "H7.2",
            title: "Meta-cognition reduces intrusions",
            statement: "Self-regulating agents have fewer intrusive decisions per session.",
            comparison: Comparison::PerSession {
                metric: SessionMetric::IntrusiveRate,
                group: FullSystem,
                control: NoMetaCognition,
            },
            rule: EffectRule::AtMost(-0.5),
        },
        CatalogEntry {
            id: "H7.3",
            title: "Meta-cognition reduces mental load",
            statement: "Self-regulating agents carry a lower mean mental load per session.",
            comparison: Comparison::PerSession {
                metric: SessionMetric::MeanMentalLoad,
                group: FullSystem,
                control: NoMetaCognition,
            },
            rule: EffectRule::AtMost(-0.5),
        },
        CatalogEntry {
            id: "H7.4",
            title: "Human-likeness differs by condition",
            statement: "The composite human-likeness score separates the capability conditions.",
            comparison: Comparison::AcrossConditions {
                metric: SessionMetric::HumanLikeness,
            },
            rule: EffectRule::AtLeast(0.14),
        },
    ];

    entries
        .into_iter()
        .map(|entry| Box::new(entry) as Box<dyn Hypothesis>)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use hec_core::condition::Condition;
    use hec_core::events::{Death, DeathInput, Decision, DecisionInput, Rumination, RuminationInput};
    use hec_core::store::SessionData;
    use hec_core::summary::SessionSummary;

    use super::{
        AnalysisConfig, AnalysisInput, CatalogEntry, Comparison, EffectRule, Hypothesis, HypothesisError,
        SessionMetric, TestStatistics, default_catalog,
    };
    use crate::stats::StatsError;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    /// Builds a session from per-decision (latency, confidence, mental load,
    /// intrusive) tuples, one per second, and deaths at given seconds.
    pub(crate) fn session(
        id: &str,
        decisions: &[(f64, f64, f64, bool)],
        deaths: &[(f64, u32)],
        ruminations: &[(f64, Option<bool>)],
    ) -> SessionData {
        let decisions: Vec<Decision> = decisions
            .iter()
            .enumerate()
            .map(|(i, &(latency_ms, confidence, mental_load, intrusive_thought))| {
                Decision::new(
                    t0() + Duration::seconds(i as i64),
                    id,
                    DecisionInput {
                        latency_ms,
                        confidence,
                        mental_load,
                        intrusive_thought,
                        ..DecisionInput::default()
                    },
                )
            })
            .collect();
        let deaths: Vec<Death> = deaths
            .iter()
            .map(|&(second, ruminations_triggered)| {
                Death::new(
                    t0() + Duration::milliseconds((second * 1000.0) as i64),
                    id,
                    DeathInput {
                        ruminations_triggered,
                        ..DeathInput::default()
                    },
                )
            })
            .collect();
        let ruminations: Vec<Rumination> = ruminations
            .iter()
            .map(|&(intrusion_frequency, suppressed)| {
                Rumination::new(
                    t0(),
                    id,
                    RuminationInput {
                        intrusion_frequency,
                        suppressed,
                        ..RuminationInput::default()
                    },
                )
            })
            .collect();
        let summary = SessionSummary::from_streams(id, t0(), t0(), &decisions, &ruminations, &deaths);
        SessionData {
            session_id: id.to_string(),
            condition: Condition::infer(id),
            generated: "20260501_080000".to_string(),
            decisions,
            ruminations,
            deaths,
            summary,
        }
    }

    /// Ten decisions at `before` ms, a death at 9.5 s, ten at `after` ms.
    fn death_session(id: &str, before: f64, after: f64) -> SessionData {
        let decisions: Vec<(f64, f64, f64, bool)> = (0..20)
            .map(|i| (if i < 10 { before } else { after }, 0.7, 0.4, false))
            .collect();
        session(id, &decisions, &[(9.5, 1)], &[])
    }

    pub(crate) fn grouped(sessions: Vec<SessionData>) -> BTreeMap<Condition, Vec<SessionData>> {
        hec_core::store::group_by_condition(sessions)
    }

    fn entry(id: &str) -> Box<dyn Hypothesis> {
        default_catalog()
            .into_iter()
            .find(|h| h.id() == id)
            .expect("catalog entry")
    }

    #[test]
    fn catalog_has_ten_entries_in_order() {
        let ids: Vec<String> = default_catalog().iter().map(|h| h.id().to_string()).collect();
        assert_eq!(
            ids,
            vec!["H6.1", "H6.2", "H6.3", "H6.4", "H6.5", "H6.6", "H7.1", "H7.2", "H7.3", "H7.4"]
        );
    }

    #[test]
    fn empty_sample_is_an_error_not_a_verdict() {
        let groups = grouped(Vec::new());
        let input = AnalysisInput::new(&groups, AnalysisConfig::default());
        let err = entry("H6.1").evaluate(&input).unwrap_err();
        assert!(matches!(
            err,
            HypothesisError::Stats(StatsError::TooFewObservations { actual: 0, .. })
        ));
    }

    #[test]
    fn large_post_death_slowdown_is_supported() {
        let mut sessions = Vec::new();
        for run in 0..8 {
            let jitter = run as f64;
            sessions.push(death_session(&format!("tier6_run{run}"), 100.0, 190.0 + jitter * 3.0));
            sessions.push(death_session(&format!("tier5_run{run}"), 100.0, 100.0 + jitter * 2.0));
        }
        let groups = grouped(sessions);
        let input = AnalysisInput::new(&groups, AnalysisConfig::default());

        let result = entry("H6.1").evaluate(&input).unwrap();
        assert_eq!(result.samples[0].n, 8);
        assert!(result.effect.value >= 0.5);
        assert!(result.statistics.p_value() < 0.005);
        assert!(result.supported);

        let paired = entry("H6.3").evaluate(&input).unwrap();
        assert!(matches!(paired.statistics, TestStatistics::PairedT(_)));
        assert!(paired.supported);
    }

    #[test]
    fn identical_shifts_are_an_error_not_a_verdict() {
        let sessions: Vec<SessionData> = (0..8)
            .map(|run| death_session(&format!("tier6_run{run}"), 100.1, 190.7))
            .collect();
        let groups = grouped(sessions);
        let err = entry("H6.3")
            .evaluate(&AnalysisInput::new(&groups, AnalysisConfig::default()))
            .unwrap_err();
        assert!(matches!(err, HypothesisError::Stats(StatsError::ZeroVariance(_))));
    }

    #[test]
    fn significance_without_effect_is_not_supported() {
        let entry = CatalogEntry {
            id: "X",
            title: "x",
            statement: "x",
            comparison: Comparison::PerSession {
                metric: SessionMetric::MeanMentalLoad,
                group: Condition::FullSystem,
                control: Condition::NoMetaCognition,
            },
            rule: EffectRule::AtMost(-100.0),
        };
        let mut sessions = Vec::new();
        for run in 0..6 {
            let jitter = run as f64 * 0.01;
            sessions.push(session(&format!("tier7_{run}"), &[(100.0, 0.7, 0.2 + jitter, false)], &[], &[]));
            sessions.push(session(&format!("tier6_{run}"), &[(100.0, 0.7, 0.8 + jitter, false)], &[], &[]));
        }
        let groups = grouped(sessions);
        let result = entry.evaluate(&AnalysisInput::new(&groups, AnalysisConfig::default())).unwrap();
        assert!(result.statistics.p_value() < 0.005);
        assert!(!result.supported);
    }

    #[test]
    fn suppression_paradox_uses_percent_increase() {
        let ruminations: Vec<(f64, Option<bool>)> = (0..10)
            .flat_map(|i| {
                let jitter = i as f64 * 0.01;
                [(0.8 + jitter, Some(true)), (0.4 + jitter, Some(false)), (0.1, None)]
            })
            .collect();
        let groups = grouped(vec![session("tier7_a", &[], &[], &ruminations)]);
        let result = entry("H7.1")
            .evaluate(&AnalysisInput::new(&groups, AnalysisConfig::default()))
            .unwrap();
        assert_eq!(result.effect.name, "percent increase");
        assert_eq!(result.samples[0].n, 10);
        assert!(result.effect.value > 80.0);
        assert!(result.supported);
    }

    #[test]
    fn regret_contingency_counts_deaths() {
        let mut sessions = Vec::new();
        for run in 0..4 {
            let deaths: Vec<(f64, u32)> = (0..5).map(|i| (i as f64, if i < 4 { 2 } else { 0 })).collect();
            sessions.push(session(&format!("tier6_{run}"), &[], &deaths, &[]));
            let deaths: Vec<(f64, u32)> = (0..5).map(|i| (i as f64, if i < 1 { 1 } else { 0 })).collect();
            sessions.push(session(&format!("tier5_{run}"), &[], &deaths, &[]));
        }
        let groups = grouped(sessions);
        let result = entry("H6.5")
            .evaluate(&AnalysisInput::new(&groups, AnalysisConfig::default()))
            .unwrap();
        let TestStatistics::ChiSquare(chi) = &result.statistics else {
            panic!("expected chi-square");
        };
        assert_eq!(chi.table, [[16, 4], [4, 16]]);
        assert!(result.effect.value > 0.3);
        assert!(result.supported);
    }

    #[test]
    fn one_way_comparison_needs_three_qualifying_conditions() {
        let decisions = vec![(100.0, 0.7, 0.4, false); 12];
        let groups = grouped(vec![
            session("tier7_a", &decisions, &[], &[]),
            session("tier7_b", &decisions, &[], &[]),
            session("tier6_a", &decisions, &[], &[]),
            session("tier6_b", &decisions, &[], &[]),
            session("tier5_a", &decisions, &[], &[]),
        ]);
        let err = entry("H7.4")
            .evaluate(&AnalysisInput::new(&groups, AnalysisConfig::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            HypothesisError::InsufficientGroups {
                required: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn correlation_reads_every_decision_of_the_group() {
        let decisions: Vec<(f64, f64, f64, bool)> = (0..30)
            .map(|i| {
                let load = i as f64 / 30.0;
                (100.0, 0.9 - load * 0.5 + if i % 2 == 0 { 0.01 } else { -0.01 }, load, false)
            })
            .collect();
        let groups = grouped(vec![session("tier6_corr", &decisions, &[], &[])]);
        let result = entry("H6.4")
            .evaluate(&AnalysisInput::new(&groups, AnalysisConfig::default()))
            .unwrap();
        assert!(result.effect.value < -0.9);
        assert!(result.supported);
    }
}
