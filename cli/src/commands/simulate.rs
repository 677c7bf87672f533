use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use hec_core::agent::{Agent, AgentReport, OutcomeReport, Perception, Tick, drive};
use hec_core::events::{DeathInput, DecisionContext, DecisionInput, RuminationInput};
use hec_core::experiment::{ExperimentConfig, create_experiment_batch};
use hec_core::session::SessionLog;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::util::{exit_error, exit_report, print_json};

const ACTIONS: [&str; 5] = ["move", "attack", "wait", "flee", "pickup"];
const GAME_STATES: [&str; 3] = ["exploration", "combat", "idle"];
const TICK_SECONDS: i64 = 8;
const TICKS_PER_LEVEL: usize = 50;
/// Decisions after a death that stay cautious
const CAUTION_TICKS: u32 = 20;

/// Random agent whose behavior follows the capabilities of its config.
///
/// Ruminating arms carry mental load after deaths and stay cautious for a
/// while; meta-cognition suppresses part of that and lets it resolve faster.
struct SyntheticAgent {
    config: ExperimentConfig,
    rng: StdRng,
    health: f64,
    active_ruminations: u32,
    caution: u32,
    started: bool,
}

impl SyntheticAgent {
    fn new(config: ExperimentConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            health: 1.0,
            active_ruminations: 0,
            caution: 0,
            started: false,
        }
    }

    fn mental_load(&self) -> f64 {
        (0.2 + 0.15 * self.active_ruminations as f64).min(1.0)
    }

    fn decide(&mut self, perception: &Perception) -> DecisionInput {
        let load = self.mental_load();
        let caution = if self.caution > 0 { 150.0 } else { 0.0 };
        let latency = 300.0 + 400.0 * load + caution + self.rng.gen_range(-50.0..50.0);
        let confidence = (0.8 - 0.35 * load + self.rng.gen_range(-0.15..0.15)).clamp(0.0, 1.0);
        let action = if self.caution > 0 && self.rng.gen_bool(0.4) {
            "flee"
        } else {
            ACTIONS[self.rng.gen_range(0..ACTIONS.len())]
        };
        let intrusive_thought =
            self.active_ruminations > 0 && self.rng.gen_bool((0.15 * self.active_ruminations as f64).min(0.9));

        DecisionInput {
            context: DecisionContext {
                game_state: perception.game_state.clone(),
                level: perception.level,
                health_fraction: self.health,
            },
            action: action.to_string(),
            alternatives: ACTIONS.iter().filter(|a| **a != action).map(|a| a.to_string()).collect(),
            latency_ms: latency.max(50.0),
            confidence,
            mental_load: load,
            active_ruminations: self.active_ruminations,
            intrusive_thought,
            dominant_emotion: if load > 0.5 { "anxiety" } else { "neutral" }.to_string(),
            fatigue: 0.0,
        }
    }

    fn ruminate(&mut self, perception: &Perception, cause: &str) -> RuminationInput {
        self.active_ruminations += 1;
        let meta = self.config.meta_cognition_active();
        RuminationInput {
            rumination_type: "counterfactual".to_string(),
            content: format!("If I had not gone into {} I would not have died to {cause}", perception.game_state),
            emotional_intensity: self.rng.gen_range(0.5..1.0),
            intrusion_frequency: if meta {
                self.rng.gen_range(0.1..0.4)
            } else {
                self.rng.gen_range(0.4..0.8)
            },
            triggered_by: "death".to_string(),
            game_state: perception.game_state.clone(),
            load_contribution: 0.15,
            decision_bias: 0.1,
            suppressed: meta.then(|| self.rng.gen_bool(0.6)),
        }
    }
}

impl Agent for SyntheticAgent {
    fn start(&mut self) -> bool {
        self.started = true;
        true
    }

    fn tick(&mut self, perception: &Perception) -> Tick {
        let decision = self.decide(perception);
        let confidence = decision.confidence;

        let damaged = self.rng.gen_bool(if decision.action == "flee" { 0.1 } else { 0.25 });
        if damaged {
            self.health -= self.rng.gen_range(0.05..0.3);
        }
        let died = self.health <= 0.0;
        let outcome = OutcomeReport {
            outcome: if died {
                "death"
            } else if damaged {
                "damaged"
            } else {
                "success"
            }
            .to_string(),
            valence: if damaged { -0.5 } else { 0.4 },
            led_to_death: died,
        };

        let mut report = AgentReport {
            decision: Some(decision),
            outcome: Some(outcome),
            ..AgentReport::default()
        };

        self.caution = self.caution.saturating_sub(1);
        let resolve = if self.config.meta_cognition_active() { 0.1 } else { 0.03 };
        if self.active_ruminations > 0 && self.rng.gen_bool(resolve) {
            self.active_ruminations -= 1;
        }

        if died {
            let cause = if perception.game_state == "combat" { "monster" } else { "trap" };
            if self.config.rumination_active() {
                let count = self.rng.gen_range(1..=2);
                report.ruminations = (0..count).map(|_| self.ruminate(perception, cause)).collect();
                self.caution = CAUTION_TICKS;
            }
            report.death = Some(DeathInput {
                level: perception.level,
                cause: cause.to_string(),
                location: format!("level {}", perception.level),
                pre_death_decisions: Vec::new(),
                pre_death_confidence: confidence,
                ruminations_triggered: report.ruminations.len() as u32,
                counterfactuals_generated: report.ruminations.len() as u32,
                regret_intensity: if report.ruminations.is_empty() { 0.0 } else { 0.7 },
            });
            self.health = 1.0;
        }

        Tick::Act(report)
    }

    fn shutdown(&mut self) {
        self.started = false;
    }
}

fn perceptions(start: DateTime<Utc>, ticks: usize) -> impl Iterator<Item = Perception> {
    (0..ticks).map(move |i| Perception {
        at: start + Duration::seconds(i as i64 * TICK_SECONDS),
        game_state: GAME_STATES[i % GAME_STATES.len()].to_string(),
        level: (i / TICKS_PER_LEVEL) as u32 + 1,
        health_fraction: 1.0,
    })
}

/// Seed of the `index`-th run of a batch. Wraps so any `--seed` is usable.
fn run_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add(index as u64)
}

pub fn run(data: &Path, runs: usize, ticks: usize, seed: Option<u64>, base_id: &str) -> i32 {
    if runs == 0 || ticks == 0 {
        exit_error("--runs and --ticks must both be at least 1", None);
    }
    let base_seed = seed.unwrap_or_else(|| rand::thread_rng().gen_range(0..u64::MAX / 2));
    let start = Utc::now() - Duration::seconds(ticks as i64 * TICK_SECONDS);

    let mut sessions = Vec::new();
    for (arm, configs) in create_experiment_batch(base_id, runs).into_values().enumerate() {
        for (run, mut config) in configs.into_iter().enumerate() {
            config.data_dir = data.to_path_buf();
            let agent_seed = run_seed(base_seed, arm * runs + run);
            config.random_seed = Some(agent_seed);

            let mut log = SessionLog::starting_at(config.session_id.clone(), data, start);
            let mut agent = SyntheticAgent::new(config.clone(), agent_seed);
            let stats = drive(&mut agent, perceptions(start, ticks), &mut log)
                .unwrap_or_else(|e| exit_report(e.report()));
            let artifacts = log.persist().unwrap_or_else(|e| exit_report(e.report()));

            sessions.push(json!({
                "session_id": config.session_id,
                "condition": config.condition,
                "seed": agent_seed,
                "stats": stats,
                "artifacts": artifacts,
            }));
        }
    }

    print_json(&json!({
        "data_dir": data.display().to_string(),
        "seed": base_seed,
        "sessions": sessions,
    }));
    0
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hec_core::agent::drive;
    use hec_core::experiment::ExperimentConfig;
    use hec_core::session::SessionLog;

    use super::{SyntheticAgent, perceptions, run_seed};

    fn run(config: ExperimentConfig, seed: u64) -> SessionLog {
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut log = SessionLog::starting_at(config.session_id.clone(), std::env::temp_dir(), start);
        let mut agent = SyntheticAgent::new(config, seed);
        drive(&mut agent, perceptions(start, 400), &mut log).unwrap();
        log
    }

    #[test]
    fn run_seeds_wrap_near_the_top_of_the_range() {
        assert_eq!(run_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(run_seed(u64::MAX, 1), 0);
        assert_eq!(run_seed(u64::MAX - 1, 5), 3);
        assert_eq!(run_seed(40, 2), 42);
    }

    #[test]
    fn same_seed_same_session() {
        let a = run(ExperimentConfig::tier7_full(Some("tier7_a".into())), 7);
        let b = run(ExperimentConfig::tier7_full(Some("tier7_a".into())), 7);
        assert_eq!(a.decisions(), b.decisions());
        assert_eq!(a.deaths().len(), b.deaths().len());
    }

    #[test]
    fn non_ruminating_arm_never_ruminates() {
        let log = run(ExperimentConfig::tier5_baseline(Some("tier5_a".into())), 11);
        assert_eq!(log.decisions().len(), 400);
        assert!(!log.deaths().is_empty());
        assert!(log.ruminations().is_empty());
        assert!(log.decisions().iter().all(|d| !d.intrusive_thought));
    }

    #[test]
    fn only_meta_cognition_suppresses() {
        let full = run(ExperimentConfig::tier7_full(Some("tier7_b".into())), 3);
        let tier6 = run(ExperimentConfig::tier6_baseline(Some("tier6_b".into())), 3);
        assert!(!full.ruminations().is_empty());
        assert!(full.ruminations().iter().all(|r| r.suppressed.is_some()));
        assert!(tier6.ruminations().iter().all(|r| r.suppressed.is_none()));
    }
}
