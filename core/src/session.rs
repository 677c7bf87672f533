//! Live, single-session event accumulator.
//!
//! ```text
//! let mut log = SessionLog::new("tier6_run_001", "research_data");
//! let d = log.record_decision(input);
//! log.update_decision_outcome(d, "survived", 0.3, false)?;
//! let death = log.record_death(death_input);
//! // ... more decisions ...
//! log.compute_post_death_shift(death, DEFAULT_WINDOW_SIZE)?;
//! log.persist()?;
//! ```

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::SessionError;
use crate::events::{
    BehavioralShift, Death, DeathInput, Decision, DecisionInput, Rumination, RuminationInput,
};
use crate::persist::{
    ArtifactKind, DeathRow, DecisionRow, PersistedArtifacts, RuminationRow, artifact_path,
    generation_stamp,
};
use crate::ring::RingBuffer;
use crate::score::{BehaviorMetrics, human_likeness};
use crate::summary::SessionSummary;
use crate::window::death_window;

pub const RECENT_DECISIONS: usize = 50;
pub const RECENT_DEATHS: usize = 10;
pub const SAMPLE_HISTORY: usize = 1000;

/// Fallback session id for callers that do not name their run.
pub fn generate_session_id() -> String {
    format!("session_{}", Uuid::now_v7().simple())
}

/// Index of a decision within the session that recorded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuminationHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeathHandle(usize);

impl DecisionHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl RuminationHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl DeathHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Accumulates one session's events while the agent runs.
///
/// Streams are unbounded and append-only; the recent windows are fixed
/// capacity and only serve live introspection. Nothing is durable until
/// [`SessionLog::persist`].
#[derive(Debug)]
pub struct SessionLog {
    session_id: String,
    output_dir: PathBuf,
    started_at: DateTime<Utc>,

    decisions: Vec<Decision>,
    ruminations: Vec<Rumination>,
    deaths: Vec<Death>,

    recent_decisions: RingBuffer<DecisionHandle>,
    recent_deaths: RingBuffer<DeathHandle>,
    mental_load_history: RingBuffer<f64>,
    confidence_history: RingBuffer<f64>,

    last_timestamp: Option<DateTime<Utc>>,
}

impl SessionLog {
    pub fn new(session_id: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self::starting_at(session_id, output_dir, Utc::now())
    }

    pub fn starting_at(
        session_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let session_id = session_id.into();
        let output_dir = output_dir.into();
        tracing::info!(
            session_id = %session_id,
            output_dir = %output_dir.display(),
            "Session log initialized"
        );
        Self {
            session_id,
            output_dir,
            started_at,
            decisions: Vec::new(),
            ruminations: Vec::new(),
            deaths: Vec::new(),
            recent_decisions: RingBuffer::new(RECENT_DECISIONS),
            recent_deaths: RingBuffer::new(RECENT_DEATHS),
            mental_load_history: RingBuffer::new(SAMPLE_HISTORY),
            confidence_history: RingBuffer::new(SAMPLE_HISTORY),
            last_timestamp: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn record_decision(&mut self, input: DecisionInput) -> DecisionHandle {
        self.record_decision_at(Utc::now(), input)
    }

    pub fn record_decision_at(&mut self, at: DateTime<Utc>, input: DecisionInput) -> DecisionHandle {
        let timestamp = self.ordered(at);
        let handle = DecisionHandle(self.decisions.len());
        self.mental_load_history.push(input.mental_load);
        self.confidence_history.push(input.confidence);
        self.decisions
            .push(Decision::new(timestamp, self.session_id.as_str(), input));
        self.recent_decisions.push(handle);
        handle
    }

    pub fn record_rumination(&mut self, input: RuminationInput) -> RuminationHandle {
        self.record_rumination_at(Utc::now(), input)
    }

    pub fn record_rumination_at(&mut self, at: DateTime<Utc>, input: RuminationInput) -> RuminationHandle {
        let timestamp = self.ordered(at);
        let handle = RuminationHandle(self.ruminations.len());
        self.ruminations
            .push(Rumination::new(timestamp, self.session_id.as_str(), input));
        handle
    }

    pub fn record_death(&mut self, input: DeathInput) -> DeathHandle {
        self.record_death_at(Utc::now(), input)
    }

    pub fn record_death_at(&mut self, at: DateTime<Utc>, input: DeathInput) -> DeathHandle {
        let timestamp = self.ordered(at);
        let handle = DeathHandle(self.deaths.len());
        self.deaths
            .push(Death::new(timestamp, self.session_id.as_str(), input));
        self.recent_deaths.push(handle);
        tracing::debug!(session_id = %self.session_id, death = handle.0, "Death recorded");
        handle
    }

    /// Attach the observed outcome to a decision. Single-call contract, see
    /// [`Decision::update_outcome`].
    pub fn update_decision_outcome(
        &mut self,
        handle: DecisionHandle,
        outcome: impl Into<String>,
        valence: f64,
        led_to_death: bool,
    ) -> Result<(), SessionError> {
        let decision = self
            .decisions
            .get_mut(handle.0)
            .ok_or(SessionError::UnknownDecision(handle.0))?;
        decision.update_outcome(outcome, valence, led_to_death);
        Ok(())
    }

    /// Recompute the behavioral shift around a death.
    ///
    /// Compares up to `window_size` decisions strictly before the death with
    /// up to `window_size` strictly after it. With fewer than five on either
    /// side nothing is written and `Ok(None)` is returned. The shift is a pure
    /// function of the decision stream, so calling this again is safe.
    pub fn compute_post_death_shift(
        &mut self,
        handle: DeathHandle,
        window_size: usize,
    ) -> Result<Option<BehavioralShift>, SessionError> {
        let at = self
            .deaths
            .get(handle.0)
            .ok_or(SessionError::UnknownDeath(handle.0))?
            .timestamp;

        let Some(shift) = death_window(&self.decisions, at, window_size).map(|w| w.shift()) else {
            return Ok(None);
        };
        self.deaths[handle.0].shift = Some(shift);
        Ok(Some(shift))
    }

    pub fn metrics(&self) -> BehaviorMetrics {
        BehaviorMetrics::from_streams(&self.decisions, self.ruminations.len(), &self.deaths)
    }

    /// Composite score over the full streams; 0 below ten decisions.
    pub fn compute_human_likeness_score(&self) -> f64 {
        human_likeness(&self.metrics())
    }

    pub fn build_session_summary(&self) -> SessionSummary {
        self.build_session_summary_at(Utc::now())
    }

    pub fn build_session_summary_at(&self, end_time: DateTime<Utc>) -> SessionSummary {
        SessionSummary::from_streams(
            self.session_id.as_str(),
            self.started_at,
            end_time,
            &self.decisions,
            &self.ruminations,
            &self.deaths,
        )
    }

    pub fn persist(&self) -> Result<PersistedArtifacts, SessionError> {
        self.persist_at(Utc::now())
    }

    /// Write the three tables and the summary, stamped with `at`.
    pub fn persist_at(&self, at: DateTime<Utc>) -> Result<PersistedArtifacts, SessionError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| SessionError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let stamp = generation_stamp(at);
        let path = |kind| artifact_path(&self.output_dir, &self.session_id, kind, &stamp);

        let artifacts = PersistedArtifacts {
            decisions: path(ArtifactKind::Decisions),
            ruminations: path(ArtifactKind::Ruminations),
            deaths: path(ArtifactKind::Deaths),
            summary: path(ArtifactKind::Summary),
        };

        write_table(
            &artifacts.decisions,
            ArtifactKind::Decisions,
            self.decisions.iter().map(DecisionRow::from),
        )?;
        write_table(
            &artifacts.ruminations,
            ArtifactKind::Ruminations,
            self.ruminations.iter().map(RuminationRow::from),
        )?;
        write_table(
            &artifacts.deaths,
            ArtifactKind::Deaths,
            self.deaths.iter().map(DeathRow::from),
        )?;

        let summary = self.build_session_summary_at(at);
        let body = serde_json::to_string_pretty(&summary).map_err(|source| SessionError::Json {
            path: artifacts.summary.clone(),
            source,
        })?;
        let mut file = File::create(&artifacts.summary).map_err(|source| SessionError::Io {
            path: artifacts.summary.clone(),
            source,
        })?;
        file.write_all(body.as_bytes())
            .map_err(|source| SessionError::Io {
                path: artifacts.summary.clone(),
                source,
            })?;

        tracing::info!(
            session_id = %summary.session_id,
            decisions = summary.total_decisions,
            ruminations = summary.total_ruminations,
            deaths = summary.total_deaths,
            duration_hours = summary.duration_hours(),
            avg_mental_load = summary.avg_mental_load,
            avg_latency_ms = summary.avg_decision_latency_ms,
            avg_confidence = summary.avg_confidence,
            sub_optimal_rate = summary.sub_optimal_decision_rate,
            regret_rate = summary.post_death_regret_rate,
            paralysis_events = summary.analysis_paralysis_events,
            intrusive_rate = summary.intrusive_thought_rate,
            human_likeness = summary.human_likeness_score,
            summary = %artifacts.summary.display(),
            "Session persisted"
        );

        Ok(artifacts)
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn ruminations(&self) -> &[Rumination] {
        &self.ruminations
    }

    pub fn deaths(&self) -> &[Death] {
        &self.deaths
    }

    pub fn decision(&self, handle: DecisionHandle) -> Option<&Decision> {
        self.decisions.get(handle.0)
    }

    pub fn rumination(&self, handle: RuminationHandle) -> Option<&Rumination> {
        self.ruminations.get(handle.0)
    }

    pub fn death(&self, handle: DeathHandle) -> Option<&Death> {
        self.deaths.get(handle.0)
    }

    /// Up to the last 50 decisions, oldest first.
    pub fn recent_decisions(&self) -> impl Iterator<Item = &Decision> {
        self.recent_decisions.iter().map(|h| &self.decisions[h.0])
    }

    /// Up to the last 10 deaths, oldest first.
    pub fn recent_deaths(&self) -> impl Iterator<Item = &Death> {
        self.recent_deaths.iter().map(|h| &self.deaths[h.0])
    }

    /// Mean mental load over the last 1000 decisions.
    pub fn recent_mental_load(&self) -> Option<f64> {
        self.mental_load_history.mean()
    }

    /// Mean confidence over the last 1000 decisions.
    pub fn recent_confidence(&self) -> Option<f64> {
        self.confidence_history.mean()
    }

    /// Keep every stream timestamp ordered: an event stamped earlier than the
    /// latest one is moved up to it.
    fn ordered(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        let timestamp = match self.last_timestamp {
            Some(last) if at < last => {
                tracing::warn!(
                    session_id = %self.session_id,
                    requested = %at,
                    latest = %last,
                    "Event timestamp precedes the latest event, clamping"
                );
                last
            }
            _ => at,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }
}

fn write_table<R: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    rows: impl Iterator<Item = R>,
) -> Result<(), SessionError> {
    let csv_err = |source| SessionError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    let mut written = 0usize;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
        written += 1;
    }
    if written == 0 {
        // serde-driven headers only appear with the first row
        writer.write_record(kind.required_columns()).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), rows = written, "Table written");
    Ok(())
}
