//! Collaborator interface for the agent under study.
//!
//! The agent's own decision logic lives elsewhere; this module only defines
//! what it reports per tick and drives a run into a [`SessionLog`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::events::{DeathInput, DecisionInput, RuminationInput};
use crate::session::SessionLog;
use crate::window::DEFAULT_WINDOW_SIZE;

/// Snapshot of the environment handed to the agent each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    /// Timestamp events of this tick are recorded at
    pub at: DateTime<Utc>,
    pub game_state: String,
    pub level: u32,
    pub health_fraction: f64,
}

/// Outcome of the decision reported in the same tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub outcome: String,
    pub valence: f64,
    pub led_to_death: bool,
}

/// Everything the agent emitted during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub decision: Option<DecisionInput>,
    pub outcome: Option<OutcomeReport>,
    pub ruminations: Vec<RuminationInput>,
    pub death: Option<DeathInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    Act(AgentReport),
    /// The agent wants to stop
    Shutdown,
}

pub trait Agent {
    /// Prepare for a run. `false` aborts before the first tick.
    fn start(&mut self) -> bool;

    fn tick(&mut self, perception: &Perception) -> Tick;

    fn shutdown(&mut self);
}

/// What a driven run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub started: bool,
    pub ticks: usize,
    pub decisions: usize,
    pub ruminations: usize,
    pub deaths: usize,
    /// Deaths that ended the run with an admissible post-death window
    pub shifted_deaths: usize,
    pub stopped_by_agent: bool,
}

/// Feed perceptions to `agent` until they run out or it asks to stop.
///
/// Within a tick the decision is recorded first, then its outcome, then
/// ruminations, then the death. Once the run ends every death gets its
/// post-death shift recomputed and the agent is shut down.
pub fn drive<A, I>(agent: &mut A, perceptions: I, log: &mut SessionLog) -> Result<RunStats, SessionError>
where
    A: Agent + ?Sized,
    I: IntoIterator<Item = Perception>,
{
    let mut stats = RunStats::default();
    if !agent.start() {
        tracing::warn!(session_id = %log.session_id(), "Agent refused to start");
        return Ok(stats);
    }
    stats.started = true;

    let mut deaths = Vec::new();
    for perception in perceptions {
        stats.ticks += 1;
        let report = match agent.tick(&perception) {
            Tick::Act(report) => report,
            Tick::Shutdown => {
                stats.stopped_by_agent = true;
                break;
            }
        };

        if let Some(decision) = report.decision {
            let handle = log.record_decision_at(perception.at, decision);
            stats.decisions += 1;
            if let Some(outcome) = report.outcome {
                log.update_decision_outcome(handle, outcome.outcome, outcome.valence, outcome.led_to_death)?;
            }
        }
        for rumination in report.ruminations {
            log.record_rumination_at(perception.at, rumination);
            stats.ruminations += 1;
        }
        if let Some(death) = report.death {
            deaths.push(log.record_death_at(perception.at, death));
            stats.deaths += 1;
        }
    }

    for death in deaths {
        if log.compute_post_death_shift(death, DEFAULT_WINDOW_SIZE)?.is_some() {
            stats.shifted_deaths += 1;
        }
    }

    agent.shutdown();
    tracing::info!(
        session_id = %log.session_id(),
        ticks = stats.ticks,
        decisions = stats.decisions,
        deaths = stats.deaths,
        stopped_by_agent = stats.stopped_by_agent,
        "Agent run finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Agent, AgentReport, OutcomeReport, Perception, Tick, drive};
    use crate::events::{DeathInput, DecisionInput, RuminationInput};
    use crate::session::SessionLog;

    /// Decides every tick, dies on tick 10, asks to stop after `stop_after`.
    struct Scripted {
        started: bool,
        shut_down: bool,
        ticks: usize,
        stop_after: usize,
        refuse: bool,
    }

    impl Scripted {
        fn new(stop_after: usize) -> Self {
            Self {
                started: false,
                shut_down: false,
                ticks: 0,
                stop_after,
                refuse: false,
            }
        }
    }

    impl Agent for Scripted {
        fn start(&mut self) -> bool {
            self.started = true;
            !self.refuse
        }

        fn tick(&mut self, perception: &Perception) -> Tick {
            self.ticks += 1;
            if self.ticks > self.stop_after {
                return Tick::Shutdown;
            }
            let dies = self.ticks == 10;
            Tick::Act(AgentReport {
                decision: Some(DecisionInput {
                    action: "explore".to_string(),
                    latency_ms: if self.ticks > 10 { 300.0 } else { 150.0 },
                    confidence: 0.7,
                    context: crate::events::DecisionContext {
                        level: perception.level,
                        ..Default::default()
                    },
                    ..DecisionInput::default()
                }),
                outcome: Some(OutcomeReport {
                    outcome: if dies { "died" } else { "survived" }.to_string(),
                    valence: if dies { -1.0 } else { 0.1 },
                    led_to_death: dies,
                }),
                ruminations: if dies {
                    vec![RuminationInput {
                        rumination_type: "REGRET_SPIRAL".to_string(),
                        ..RuminationInput::default()
                    }]
                } else {
                    Vec::new()
                },
                death: dies.then(|| DeathInput {
                    ruminations_triggered: 1,
                    ..DeathInput::default()
                }),
            })
        }

        fn shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    fn perceptions(n: usize) -> impl Iterator<Item = Perception> {
        let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        (0..n).map(move |i| Perception {
            at: t0 + Duration::seconds(i as i64),
            game_state: "exploration".to_string(),
            level: 1 + (i / 10) as u32,
            health_fraction: 1.0,
        })
    }

    #[test]
    fn run_records_reports_and_shifts_deaths() {
        let mut agent = Scripted::new(usize::MAX);
        let mut log = SessionLog::new("tier6_driven", std::env::temp_dir());
        let stats = drive(&mut agent, perceptions(20), &mut log).unwrap();

        assert!(stats.started);
        assert_eq!(stats.ticks, 20);
        assert_eq!(stats.decisions, 20);
        assert_eq!(stats.deaths, 1);
        assert_eq!(stats.ruminations, 1);
        assert_eq!(stats.shifted_deaths, 1);
        assert!(agent.shut_down);

        assert!(log.decisions()[9].outcome.as_ref().unwrap().led_to_death);
        let shift = log.deaths()[0].shift.expect("9 decisions before, 10 after");
        assert_eq!(shift.latency_increase, 150.0);
    }

    #[test]
    fn agent_can_stop_the_run() {
        let mut agent = Scripted::new(5);
        let mut log = SessionLog::new("tier5_short", std::env::temp_dir());
        let stats = drive(&mut agent, perceptions(20), &mut log).unwrap();
        assert!(stats.stopped_by_agent);
        assert_eq!(stats.decisions, 5);
        assert_eq!(log.decisions().len(), 5);
    }

    #[test]
    fn refused_start_records_nothing() {
        let mut agent = Scripted::new(usize::MAX);
        agent.refuse = true;
        let mut log = SessionLog::new("tier7_refused", std::env::temp_dir());
        let stats = drive(&mut agent, perceptions(20), &mut log).unwrap();
        assert!(agent.started);
        assert!(!stats.started);
        assert!(log.decisions().is_empty());
        assert!(!agent.shut_down);
    }
}
