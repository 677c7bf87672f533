//! Read-only snapshots of a data directory for live monitoring.
//!
//! Tables may be mid-write when a snapshot is taken. Per-file failures are
//! captured into the snapshot and never abort it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hec_core::condition::Condition;
use hec_core::error::StoreError;
use hec_core::persist::{ArtifactKind, DecisionRow};
use regex::Regex;
use serde::Serialize;

/// Rumination-capable sessions past this many decisions should have ruminated.
const RUMINATION_EXPECTED_AFTER: usize = 100;
/// Sessions past this many decisions are expected to have died at least once.
const DEATH_EXPECTED_AFTER: usize = 500;
/// Grace period before the decision rate is checked.
const RATE_CHECK_AFTER: Duration = Duration::from_secs(600);
const MIN_DECISIONS_AFTER_GRACE: usize = 50;

const TABLE_NAME: &str =
    r"^(?P<id>.+)_(?P<kind>decisions|ruminations|deaths)_(?P<generated>\d{8}_\d{6})\.csv$";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub generated: String,
    pub condition: Condition,
    pub decisions: usize,
    pub ruminations: usize,
    pub deaths: usize,
    pub mean_latency_ms: Option<f64>,
    pub mean_mental_load: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
    /// Per-file read failures, e.g. a row cut off mid-write
    pub errors: Vec<String>,
}

impl SessionSnapshot {
    fn new(session_id: &str, generated: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            generated: generated.to_string(),
            condition: Condition::infer(session_id),
            decisions: 0,
            ruminations: 0,
            deaths: 0,
            mean_latency_ms: None,
            mean_mental_load: None,
            last_update: None,
            errors: Vec::new(),
        }
    }

    /// Problems worth flagging, empty when the session looks healthy.
    pub fn health_issues(&self, elapsed: Duration) -> Vec<String> {
        let mut issues = Vec::new();
        if self.decisions == 0 {
            issues.push("No decisions logged yet".to_string());
        }
        let ruminates = matches!(self.condition, Condition::FullSystem | Condition::NoMetaCognition);
        if ruminates && self.decisions > RUMINATION_EXPECTED_AFTER && self.ruminations == 0 {
            issues.push(format!(
                "No ruminations despite >{RUMINATION_EXPECTED_AFTER} decisions (check rumination triggering)"
            ));
        }
        if self.decisions > DEATH_EXPECTED_AFTER && self.deaths == 0 {
            issues.push("No deaths logged (unusually safe gameplay)".to_string());
        }
        if elapsed > RATE_CHECK_AFTER && self.decisions < MIN_DECISIONS_AFTER_GRACE {
            let per_minute = self.decisions as f64 / (elapsed.as_secs_f64() / 60.0);
            issues.push(format!("Low decision rate: {per_minute:.1}/min (expected ~5-10/min)"));
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorySnapshot {
    pub taken_at: DateTime<Utc>,
    pub dir: PathBuf,
    pub directory_present: bool,
    pub sessions: Vec<SessionSnapshot>,
}

impl DirectorySnapshot {
    pub fn totals(&self) -> (usize, usize, usize) {
        self.sessions.iter().fold((0, 0, 0), |(d, r, x), s| {
            (d + s.decisions, r + s.ruminations, x + s.deaths)
        })
    }
}

/// Scan `dir` for session tables and summarize each session found.
///
/// An absent directory yields an empty snapshot; only a failure to list an
/// existing directory is an error.
pub fn snapshot_directory(dir: &Path) -> Result<DirectorySnapshot, StoreError> {
    let taken_at = Utc::now();
    if !dir.is_dir() {
        return Ok(DirectorySnapshot {
            taken_at,
            dir: dir.to_path_buf(),
            directory_present: false,
            sessions: Vec::new(),
        });
    }

    let table_name = Regex::new(TABLE_NAME).map_err(|source| StoreError::InvalidPattern {
        pattern: TABLE_NAME.to_string(),
        source,
    })?;
    let entries = std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tables: BTreeMap<(String, String), Vec<(ArtifactKind, PathBuf)>> = BTreeMap::new();
    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(captures) = table_name.captures(name) else {
            continue;
        };
        let kind = match &captures["kind"] {
            "decisions" => ArtifactKind::Decisions,
            "ruminations" => ArtifactKind::Ruminations,
            _ => ArtifactKind::Deaths,
        };
        tables
            .entry((captures["id"].to_string(), captures["generated"].to_string()))
            .or_default()
            .push((kind, entry.path()));
    }

    let sessions = tables
        .into_iter()
        .map(|((id, generated), files)| {
            let mut snapshot = SessionSnapshot::new(&id, &generated);
            for (kind, path) in files {
                if let Err(err) = read_into(&mut snapshot, kind, &path) {
                    tracing::debug!(path = %path.display(), error = %err, "Partial table read");
                    snapshot.errors.push(format!("{}: {err}", kind.label()));
                }
            }
            snapshot
        })
        .collect();

    Ok(DirectorySnapshot {
        taken_at,
        dir: dir.to_path_buf(),
        directory_present: true,
        sessions,
    })
}

/// Count what is readable; rows before a failure still count.
fn read_into(snapshot: &mut SessionSnapshot, kind: ArtifactKind, path: &Path) -> Result<(), csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    match kind {
        ArtifactKind::Decisions => {
            let (mut latency, mut load) = (0.0, 0.0);
            let mut outcome = Ok(());
            for row in reader.deserialize::<DecisionRow>() {
                match row {
                    Ok(row) => {
                        snapshot.decisions += 1;
                        latency += row.latency_ms;
                        load += row.mental_load;
                        snapshot.last_update = Some(row.timestamp);
                    }
                    Err(err) => {
                        outcome = Err(err);
                        break;
                    }
                }
            }
            if snapshot.decisions > 0 {
                let n = snapshot.decisions as f64;
                snapshot.mean_latency_ms = Some(latency / n);
                snapshot.mean_mental_load = Some(load / n);
            }
            outcome
        }
        ArtifactKind::Ruminations | ArtifactKind::Deaths | ArtifactKind::Summary => {
            for record in reader.records() {
                record?;
                match kind {
                    ArtifactKind::Ruminations => snapshot.ruminations += 1,
                    _ => snapshot.deaths += 1,
                }
            }
            Ok(())
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Plain-text dashboard for one snapshot.
pub fn render_dashboard(snapshot: &DirectorySnapshot, elapsed: Duration) -> String {
    let rule = "=".repeat(96);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "EXPERIMENT MONITOR - {}",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Elapsed: {}", format_elapsed(elapsed));
    let _ = writeln!(out, "{rule}\n");

    if snapshot.sessions.is_empty() {
        let _ = writeln!(
            out,
            "No sessions detected in {}. Waiting for data files...\n",
            snapshot.dir.display()
        );
        let _ = writeln!(out, "Expected files:");
        for kind in ArtifactKind::TABLES {
            let _ = writeln!(out, "  - *_{}_*.csv", kind.label());
        }
        return out;
    }

    let _ = writeln!(
        out,
        "{:<32} {:>10} {:>8} {:>12} {:>12} {:>11}  {:<20}",
        "Session", "Decisions", "Deaths", "Ruminations", "Latency ms", "Mental load", "Last update"
    );
    let _ = writeln!(out, "{}", "-".repeat(96));
    for s in &snapshot.sessions {
        let _ = writeln!(
            out,
            "{:<32} {:>10} {:>8} {:>12} {:>12.1} {:>11.3}  {:<20}",
            s.session_id,
            s.decisions,
            s.deaths,
            s.ruminations,
            s.mean_latency_ms.unwrap_or(0.0),
            s.mean_mental_load.unwrap_or(0.0),
            s.last_update
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        );
        for err in &s.errors {
            let _ = writeln!(out, "  ⚠ {err}");
        }
    }

    let (decisions, ruminations, deaths) = snapshot.totals();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(
        out,
        "TOTALS: {decisions} decisions | {deaths} deaths | {ruminations} ruminations\n"
    );
    let _ = writeln!(out, "HEALTH CHECKS:");
    for s in &snapshot.sessions {
        let issues = s.health_issues(elapsed);
        if issues.is_empty() {
            let _ = writeln!(out, "  ✓ {}: Healthy", s.session_id);
        } else {
            let _ = writeln!(out, "  ⚠ {}: {}", s.session_id, issues.join(", "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use hec_core::events::{DeathInput, DecisionInput};
    use hec_core::persist::{ArtifactKind, artifact_path};
    use hec_core::session::SessionLog;

    use super::{SessionSnapshot, render_dashboard, snapshot_directory};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hec-monitor-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn persist(dir: &PathBuf, id: &str, decisions: usize) -> String {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut log = SessionLog::starting_at(id, dir.clone(), t0);
        for i in 0..decisions {
            log.record_decision_at(
                t0 + ChronoDuration::seconds(i as i64),
                DecisionInput {
                    latency_ms: 200.0,
                    mental_load: 0.5,
                    confidence: 0.7,
                    ..DecisionInput::default()
                },
            );
        }
        log.record_death_at(t0 + ChronoDuration::seconds(decisions as i64), DeathInput::default());
        log.persist_at(t0).unwrap();
        "20260701_000000".to_string()
    }

    #[test]
    fn absent_directory_is_an_empty_snapshot() {
        let dir = std::env::temp_dir().join(format!("hec-monitor-absent-{}", uuid::Uuid::now_v7()));
        let snapshot = snapshot_directory(&dir).unwrap();
        assert!(!snapshot.directory_present);
        assert!(snapshot.sessions.is_empty());
        assert!(render_dashboard(&snapshot, Duration::ZERO).contains("Waiting for data files"));
    }

    #[test]
    fn sessions_are_counted_per_table() {
        let dir = temp_dir();
        persist(&dir, "tier7_live", 4);

        let snapshot = snapshot_directory(&dir).unwrap();
        assert_eq!(snapshot.sessions.len(), 1);
        let session = &snapshot.sessions[0];
        assert_eq!(session.decisions, 4);
        assert_eq!(session.deaths, 1);
        assert_eq!(session.ruminations, 0);
        assert_eq!(session.mean_latency_ms, Some(200.0));
        assert!(session.errors.is_empty());
        assert_eq!(snapshot.totals(), (4, 0, 1));
    }

    #[test]
    fn truncated_table_is_reported_not_fatal() {
        let dir = temp_dir();
        let generated = persist(&dir, "tier6_live", 3);
        let path = artifact_path(&dir, "tier6_live", ArtifactKind::Decisions, &generated);
        let mut body = std::fs::read_to_string(&path).unwrap();
        body.push_str("2026-07-01T00:00:09Z,tier6_live,unkn");
        std::fs::write(&path, body).unwrap();

        let snapshot = snapshot_directory(&dir).unwrap();
        let session = &snapshot.sessions[0];
        assert_eq!(session.decisions, 3);
        assert_eq!(session.errors.len(), 1);
        assert!(session.errors[0].starts_with("decisions"));
        assert!(render_dashboard(&snapshot, Duration::ZERO).contains("⚠ decisions"));
    }

    #[test]
    fn health_checks_flag_stalled_sessions() {
        let mut snapshot = SessionSnapshot::new("tier6_run", "20260701_000000");
        snapshot.decisions = 150;
        let issues = snapshot.health_issues(Duration::from_secs(60));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("No ruminations"));

        let mut quiet = SessionSnapshot::new("tier5_run", "20260701_000000");
        quiet.decisions = 10;
        let issues = quiet.health_issues(Duration::from_secs(1200));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("Low decision rate: 0.5/min"));
    }
}
