//! Tabular row shapes and artifact naming for persisted sessions.
//!
//! Sessions persist as three CSV tables plus a JSON summary:
//! `{session_id}_decisions_{ts}.csv`, `{session_id}_ruminations_{ts}.csv`,
//! `{session_id}_deaths_{ts}.csv` and `{session_id}_summary_{ts}.json`.
//!
//! List-valued fields are flattened into one cell joined by `|`. Elements are
//! escaped (`\` → `\\`, `|` → `\|`, empty element → `\e`) so a cell always
//! splits back into the original sequence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{BehavioralShift, Death, Decision, DecisionContext, DecisionOutcome, Rumination};

pub const LIST_DELIMITER: char = '|';

/// `strftime` format of the generation timestamp in artifact names.
pub const GENERATION_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Decisions,
    Ruminations,
    Deaths,
    Summary,
}

impl ArtifactKind {
    pub const TABLES: [ArtifactKind; 3] = [Self::Decisions, Self::Ruminations, Self::Deaths];

    pub fn label(self) -> &'static str {
        match self {
            Self::Decisions => "decisions",
            Self::Ruminations => "ruminations",
            Self::Deaths => "deaths",
            Self::Summary => "summary",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Summary => "json",
            _ => "csv",
        }
    }

    /// Columns a table must carry. Optional columns may be absent.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Decisions => DECISION_COLUMNS,
            Self::Ruminations => RUMINATION_COLUMNS,
            Self::Deaths => DEATH_COLUMNS,
            Self::Summary => &[],
        }
    }
}

const DECISION_COLUMNS: &[&str] = &[
    "timestamp",
    "session_id",
    "game_state",
    "level",
    "health_fraction",
    "action",
    "alternatives",
    "latency_ms",
    "confidence",
    "mental_load",
    "active_ruminations",
    "intrusive_thought",
    "dominant_emotion",
    "fatigue",
];

const RUMINATION_COLUMNS: &[&str] = &[
    "timestamp",
    "session_id",
    "rumination_type",
    "content",
    "emotional_intensity",
    "intrusion_frequency",
    "triggered_by",
    "game_state",
    "load_contribution",
    "decision_bias",
];

const DEATH_COLUMNS: &[&str] = &[
    "timestamp",
    "session_id",
    "level",
    "cause",
    "location",
    "pre_death_decisions",
    "pre_death_confidence",
    "ruminations_triggered",
    "counterfactuals_generated",
    "regret_intensity",
];

/// `{dir}/{session_id}_{kind}_{generated}.{ext}`
pub fn artifact_path(dir: &Path, session_id: &str, kind: ArtifactKind, generated: &str) -> PathBuf {
    dir.join(format!(
        "{session_id}_{}_{generated}.{}",
        kind.label(),
        kind.extension()
    ))
}

pub fn generation_stamp(at: DateTime<Utc>) -> String {
    at.format(GENERATION_FORMAT).to_string()
}

/// Paths written by one `persist` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedArtifacts {
    pub decisions: PathBuf,
    pub ruminations: PathBuf,
    pub deaths: PathBuf,
    pub summary: PathBuf,
}

/// Join a list into one cell, escaping each element.
pub fn encode_list(items: &[String]) -> String {
    let mut cell = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            cell.push(LIST_DELIMITER);
        }
        if item.is_empty() {
            cell.push_str("\\e");
            continue;
        }
        for ch in item.chars() {
            if ch == '\\' || ch == LIST_DELIMITER {
                cell.push('\\');
            }
            cell.push(ch);
        }
    }
    cell
}

/// Inverse of [`encode_list`]. An empty cell is an empty list.
///
/// Unknown escapes are kept verbatim, backslash included, so a plain
/// `|`-joined cell such as `C:\dir|x` splits the way it was joined unless
/// an element contains `\\`, `\|` or `\e`, or ends in a backslash.
pub fn decode_list(cell: &str) -> Vec<String> {
    if cell.is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = cell.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('e') => {}
                Some(escaped) if escaped == '\\' || escaped == LIST_DELIMITER => current.push(escaped),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            c if c == LIST_DELIMITER => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);
    items
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRow {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub game_state: String,
    pub level: u32,
    pub health_fraction: f64,
    pub action: String,
    pub alternatives: String,
    pub latency_ms: f64,
    pub confidence: f64,
    pub mental_load: f64,
    pub active_ruminations: u32,
    pub intrusive_thought: bool,
    pub dominant_emotion: String,
    pub fatigue: f64,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub outcome_valence: Option<f64>,
    #[serde(default)]
    pub led_to_death: Option<bool>,
}

impl From<&Decision> for DecisionRow {
    fn from(d: &Decision) -> Self {
        Self {
            timestamp: d.timestamp,
            session_id: d.session_id.clone(),
            game_state: d.context.game_state.clone(),
            level: d.context.level,
            health_fraction: d.context.health_fraction,
            action: d.action.clone(),
            alternatives: encode_list(&d.alternatives),
            latency_ms: d.latency_ms,
            confidence: d.confidence,
            mental_load: d.mental_load,
            active_ruminations: d.active_ruminations,
            intrusive_thought: d.intrusive_thought,
            dominant_emotion: d.dominant_emotion.clone(),
            fatigue: d.fatigue,
            outcome: d.outcome.as_ref().map(|o| o.outcome.clone()),
            outcome_valence: d.outcome.as_ref().map(|o| o.valence),
            led_to_death: d.outcome.as_ref().map(|o| o.led_to_death),
        }
    }
}

impl From<DecisionRow> for Decision {
    fn from(row: DecisionRow) -> Self {
        // An empty outcome tag reads back as a missing cell, so any of the
        // three outcome columns marks the update as done.
        let outcome = match (row.outcome, row.outcome_valence, row.led_to_death) {
            (None, None, None) => None,
            (outcome, valence, led_to_death) => Some(DecisionOutcome {
                outcome: outcome.unwrap_or_default(),
                valence: valence.unwrap_or(0.0),
                led_to_death: led_to_death.unwrap_or(false),
            }),
        };
        Self {
            timestamp: row.timestamp,
            session_id: row.session_id,
            context: DecisionContext {
                game_state: row.game_state,
                level: row.level,
                health_fraction: row.health_fraction,
            },
            action: row.action,
            alternatives: decode_list(&row.alternatives),
            latency_ms: row.latency_ms,
            confidence: row.confidence,
            mental_load: row.mental_load,
            active_ruminations: row.active_ruminations,
            intrusive_thought: row.intrusive_thought,
            dominant_emotion: row.dominant_emotion,
            fatigue: row.fatigue,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuminationRow {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub rumination_type: String,
    pub content: String,
    pub emotional_intensity: f64,
    pub intrusion_frequency: f64,
    pub triggered_by: String,
    pub game_state: String,
    pub load_contribution: f64,
    pub decision_bias: f64,
    #[serde(default)]
    pub suppressed: Option<bool>,
}

impl From<&Rumination> for RuminationRow {
    fn from(r: &Rumination) -> Self {
        Self {
            timestamp: r.timestamp,
            session_id: r.session_id.clone(),
            rumination_type: r.rumination_type.clone(),
            content: r.content.clone(),
            emotional_intensity: r.emotional_intensity,
            intrusion_frequency: r.intrusion_frequency,
            triggered_by: r.triggered_by.clone(),
            game_state: r.game_state.clone(),
            load_contribution: r.load_contribution,
            decision_bias: r.decision_bias,
            suppressed: r.suppressed,
        }
    }
}

impl From<RuminationRow> for Rumination {
    fn from(row: RuminationRow) -> Self {
        Self {
            timestamp: row.timestamp,
            session_id: row.session_id,
            rumination_type: row.rumination_type,
            content: row.content,
            emotional_intensity: row.emotional_intensity,
            intrusion_frequency: row.intrusion_frequency,
            triggered_by: row.triggered_by,
            game_state: row.game_state,
            load_contribution: row.load_contribution,
            decision_bias: row.decision_bias,
            suppressed: row.suppressed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRow {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub level: u32,
    pub cause: String,
    pub location: String,
    pub pre_death_decisions: String,
    pub pre_death_confidence: f64,
    pub ruminations_triggered: u32,
    pub counterfactuals_generated: u32,
    pub regret_intensity: f64,
    #[serde(default)]
    pub decision_latency_increase: Option<f64>,
    #[serde(default)]
    pub risk_aversion_increase: Option<f64>,
    #[serde(default)]
    pub confidence_change: Option<f64>,
}

impl From<&Death> for DeathRow {
    fn from(d: &Death) -> Self {
        Self {
            timestamp: d.timestamp,
            session_id: d.session_id.clone(),
            level: d.level,
            cause: d.cause.clone(),
            location: d.location.clone(),
            pre_death_decisions: encode_list(&d.pre_death_decisions),
            pre_death_confidence: d.pre_death_confidence,
            ruminations_triggered: d.ruminations_triggered,
            counterfactuals_generated: d.counterfactuals_generated,
            regret_intensity: d.regret_intensity,
            decision_latency_increase: d.shift.map(|s| s.latency_increase),
            risk_aversion_increase: d.shift.map(|s| s.risk_aversion_increase),
            confidence_change: d.shift.map(|s| s.confidence_change),
        }
    }
}

impl From<DeathRow> for Death {
    fn from(row: DeathRow) -> Self {
        // The three shift columns are written together or not at all.
        let shift = match (
            row.decision_latency_increase,
            row.risk_aversion_increase,
            row.confidence_change,
        ) {
            (Some(latency_increase), Some(risk_aversion_increase), Some(confidence_change)) => {
                Some(BehavioralShift {
                    latency_increase,
                    risk_aversion_increase,
                    confidence_change,
                })
            }
            _ => None,
        };
        Self {
            timestamp: row.timestamp,
            session_id: row.session_id,
            level: row.level,
            cause: row.cause,
            location: row.location,
            pre_death_decisions: decode_list(&row.pre_death_decisions),
            pre_death_confidence: row.pre_death_confidence,
            ruminations_triggered: row.ruminations_triggered,
            counterfactuals_generated: row.counterfactuals_generated,
            regret_intensity: row.regret_intensity,
            shift,
        }
    }
}
