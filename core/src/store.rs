//! Batch loading of persisted sessions.
//!
//! A session is discovered through its summary file; the three tables are
//! located by the same id and generation stamp. Loading is lenient per
//! session (a malformed one is skipped with a warning) and strict per batch
//! (a missing directory fails the whole load).

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::condition::Condition;
use crate::error::{LoadError, StoreError};
use crate::events::{Death, Decision, Rumination};
use crate::persist::{ArtifactKind, DeathRow, DecisionRow, RuminationRow, artifact_path};
use crate::score::BehaviorMetrics;
use crate::summary::SessionSummary;
use crate::window::death_window;

/// Everything persisted for one session. Read-only once loaded, apart from
/// [`SessionData::recompute_death_shifts`].
#[derive(Debug, Clone)]
pub struct SessionData {
    pub session_id: String,
    pub condition: Condition,
    /// Generation stamp shared by the session's artifacts
    pub generated: String,
    pub decisions: Vec<Decision>,
    pub ruminations: Vec<Rumination>,
    pub deaths: Vec<Death>,
    pub summary: SessionSummary,
}

impl SessionData {
    /// Scorer inputs over the loaded streams.
    pub fn metrics(&self) -> BehaviorMetrics {
        BehaviorMetrics::from_streams(&self.decisions, self.ruminations.len(), &self.deaths)
    }

    /// Rewrite the behavioral shift of every death with an admissible window.
    /// Returns how many deaths carry a shift afterwards.
    pub fn recompute_death_shifts(&mut self, window_size: usize) -> usize {
        let mut written = 0;
        for death in &mut self.deaths {
            if let Some(window) = death_window(&self.decisions, death.timestamp, window_size) {
                death.shift = Some(window.shift());
                written += 1;
            }
        }
        written
    }
}

/// Translate a session id glob (`*` any run, `?` one character) into an
/// anchored regex over summary file names. Captures `id` and `generated`.
pub fn pattern_regex(pattern: &str) -> Result<Regex, StoreError> {
    let mut id = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' => id.push_str(".*"),
            '?' => id.push('.'),
            c => id.push_str(&regex::escape(&c.to_string())),
        }
    }
    let source = format!(
        r"^(?P<id>{id})_{}_(?P<generated>\d{{8}}_\d{{6}})\.{}$",
        ArtifactKind::Summary.label(),
        ArtifactKind::Summary.extension()
    );
    Regex::new(&source).map_err(|source| StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Load every session in `dir` whose id matches `pattern`, ordered by summary
/// file name.
pub fn load(dir: &Path, pattern: &str) -> Result<Vec<SessionData>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::MissingDirectory(dir.to_path_buf()));
    }
    let matcher = pattern_regex(pattern)?;

    let entries = std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            if matcher.is_match(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    let mut sessions = Vec::with_capacity(names.len());
    let mut skipped = 0usize;
    for name in &names {
        let Some(captures) = matcher.captures(name) else {
            continue;
        };
        let id = &captures["id"];
        let generated = &captures["generated"];
        match load_session(dir, id, generated) {
            Ok(session) => sessions.push(session),
            Err(err) => {
                skipped += 1;
                tracing::warn!(
                    file = %name,
                    code = err.code(),
                    error = %err,
                    "Skipping session"
                );
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        pattern,
        loaded = sessions.len(),
        skipped,
        "Sessions loaded"
    );
    Ok(sessions)
}

/// Load one session from its artifacts. Absent tables load as empty streams.
pub fn load_session(dir: &Path, session_id: &str, generated: &str) -> Result<SessionData, LoadError> {
    let summary_path = artifact_path(dir, session_id, ArtifactKind::Summary, generated);
    let body = std::fs::read_to_string(&summary_path).map_err(|source| LoadError::Io {
        path: summary_path.clone(),
        source,
    })?;
    let summary: SessionSummary = serde_json::from_str(&body).map_err(|source| LoadError::Json {
        path: summary_path.clone(),
        source,
    })?;

    let table = |kind| artifact_path(dir, session_id, kind, generated);
    let mut decisions: Vec<Decision> =
        read_table::<DecisionRow, _>(&table(ArtifactKind::Decisions), ArtifactKind::Decisions)?;
    let mut ruminations: Vec<Rumination> =
        read_table::<RuminationRow, _>(&table(ArtifactKind::Ruminations), ArtifactKind::Ruminations)?;
    let mut deaths: Vec<Death> = read_table::<DeathRow, _>(&table(ArtifactKind::Deaths), ArtifactKind::Deaths)?;

    decisions.sort_by_key(|d| d.timestamp);
    ruminations.sort_by_key(|r| r.timestamp);
    deaths.sort_by_key(|d| d.timestamp);

    tracing::debug!(
        session_id,
        decisions = decisions.len(),
        ruminations = ruminations.len(),
        deaths = deaths.len(),
        "Session artifacts read"
    );

    Ok(SessionData {
        session_id: session_id.to_string(),
        condition: Condition::infer(session_id),
        generated: generated.to_string(),
        decisions,
        ruminations,
        deaths,
        summary,
    })
}

fn read_table<R, T>(path: &Path, kind: ArtifactKind) -> Result<Vec<T>, LoadError>
where
    R: DeserializeOwned,
    T: From<R>,
{
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Table absent, loading empty stream");
        return Ok(Vec::new());
    }
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    if let Some(column) = kind
        .required_columns()
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        });
    }

    reader
        .deserialize::<R>()
        .map(|row| row.map(T::from).map_err(csv_err))
        .collect()
}

/// Partition sessions by inferred condition, keeping load order within a group.
pub fn group_by_condition(sessions: Vec<SessionData>) -> BTreeMap<Condition, Vec<SessionData>> {
    let mut groups: BTreeMap<Condition, Vec<SessionData>> = BTreeMap::new();
    for session in sessions {
        groups.entry(session.condition).or_default().push(session);
    }
    groups
}
