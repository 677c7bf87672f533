//! Markdown report and raw statistics output.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hec_core::condition::Condition;
use hec_core::store::SessionData;
use serde::Serialize;
use thiserror::Error;

use crate::hypotheses::HypothesisResult;
use crate::runner::HypothesisResults;

/// Supported hypotheses needed to write the results up.
pub const PUBLICATION_THRESHOLD: usize = 5;

/// Supported hypotheses for a strong result.
pub const STRONG_THRESHOLD: usize = 8;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize raw results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Mean post-death shift of one condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftRow {
    pub condition: Condition,
    pub deaths: usize,
    /// Deaths with an admissible window
    pub shifted: usize,
    pub latency_increase: Option<f64>,
    pub risk_aversion_increase: Option<f64>,
    pub confidence_change: Option<f64>,
}

/// Everything the report shows besides hypothesis outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    pub generated_at: DateTime<Utc>,
    pub data_dir: String,
    pub pattern: String,
    pub window_size: usize,
    pub sessions_per_condition: BTreeMap<Condition, usize>,
    pub shifts: Vec<ShiftRow>,
}

impl ReportContext {
    /// Recompute every death's shift and summarize per condition.
    pub fn build(
        groups: &mut BTreeMap<Condition, Vec<SessionData>>,
        data_dir: impl Into<String>,
        pattern: impl Into<String>,
        window_size: usize,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut shifts = Vec::new();
        for (&condition, sessions) in groups.iter_mut() {
            let mut row = ShiftRow {
                condition,
                deaths: 0,
                shifted: 0,
                latency_increase: None,
                risk_aversion_increase: None,
                confidence_change: None,
            };
            let mut sums = [0.0; 3];
            for session in sessions.iter_mut() {
                session.recompute_death_shifts(window_size);
                row.deaths += session.deaths.len();
                for shift in session.deaths.iter().filter_map(|d| d.shift) {
                    row.shifted += 1;
                    sums[0] += shift.latency_increase;
                    sums[1] += shift.risk_aversion_increase;
                    sums[2] += shift.confidence_change;
                }
            }
            if row.shifted > 0 {
                let n = row.shifted as f64;
                row.latency_increase = Some(sums[0] / n);
                row.risk_aversion_increase = Some(sums[1] / n);
                row.confidence_change = Some(sums[2] / n);
            }
            shifts.push(row);
        }

        Self {
            generated_at,
            data_dir: data_dir.into(),
            pattern: pattern.into(),
            window_size,
            sessions_per_condition: groups.iter().map(|(c, s)| (*c, s.len())).collect(),
            shifts,
        }
    }

    pub fn total_sessions(&self) -> usize {
        self.sessions_per_condition.values().sum()
    }
}

pub fn render_report(context: &ReportContext, results: &HypothesisResults) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Cognition Experiment Analysis Report\n");
    let _ = writeln!(md, "Generated: {}", context.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(md, "Data: `{}` (pattern `{}`)\n", context.data_dir, context.pattern);

    let _ = writeln!(md, "## Sessions Loaded\n");
    if context.total_sessions() == 0 {
        let _ = writeln!(md, "No sessions loaded. Nothing to test.\n");
    } else {
        for (condition, count) in &context.sessions_per_condition {
            let _ = writeln!(md, "- {}: {count} sessions", condition.label());
        }
        md.push('\n');
    }

    render_shifts(&mut md, context);

    let _ = writeln!(md, "## Hypothesis Tests\n");
    for result in results.completed() {
        render_hypothesis(&mut md, result);
    }

    render_tally(&mut md, results);
    md
}

fn render_shifts(md: &mut String, context: &ReportContext) {
    if context.shifts.is_empty() {
        return;
    }
    let _ = writeln!(
        md,
        "## Post-Death Behavioral Shift\n\nMeans over deaths with at least 5 decisions on each side (window {}).\n",
        context.window_size
    );
    let _ = writeln!(
        md,
        "| Condition | Deaths | Admissible | Δ latency (ms) | Δ low-confidence share | Δ confidence |"
    );
    let _ = writeln!(md, "|---|---|---|---|---|---|");
    let cell = |v: Option<f64>, precision: usize| match v {
        Some(v) => format!("{v:+.precision$}"),
        None => "n/a".to_string(),
    };
    for row in &context.shifts {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} |",
            row.condition.label(),
            row.deaths,
            row.shifted,
            cell(row.latency_increase, 1),
            cell(row.risk_aversion_increase, 3),
            cell(row.confidence_change, 3),
        );
    }
    md.push('\n');
}

fn render_hypothesis(md: &mut String, result: &HypothesisResult) {
    let _ = writeln!(md, "### {}: {}\n", result.id, result.title);
    let _ = writeln!(md, "**Hypothesis**: {}\n", result.statement);
    let _ = writeln!(md, "```");
    let _ = writeln!(md, "{:<32} {:>6} {:>12} {:>12}", "Sample", "n", "Mean", "SD");
    for sample in &result.samples {
        let _ = writeln!(
            md,
            "{:<32} {:>6} {:>12.3} {:>12.3}",
            sample.label, sample.n, sample.mean, sample.sd
        );
    }
    let _ = writeln!(md);
    let _ = writeln!(md, "{}", result.statistics.render());
    let _ = writeln!(
        md,
        "{} = {:.2} (required {}), alpha = {}",
        result.effect.name, result.effect.value, result.rule, result.alpha
    );
    let _ = writeln!(md, "```\n");
    let verdict = if result.supported {
        "✓ SUPPORTED"
    } else {
        "✗ NOT SUPPORTED"
    };
    let _ = writeln!(md, "**Verdict**: {verdict}\n");
}

fn render_tally(md: &mut String, results: &HypothesisResults) {
    let supported = results.supported_count();
    let total = results.completed_count();
    let catalog = results.len();
    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "Supported: {supported}/{total} hypotheses");
    let errored = catalog - total;
    if errored > 0 {
        let _ = writeln!(md, "Not testable with this data: {errored}");
    }
    let _ = writeln!(md, "Minimum for publication: {PUBLICATION_THRESHOLD}/{catalog}");
    let _ = writeln!(md, "Strong publication: {STRONG_THRESHOLD}/{catalog}\n");

    let _ = writeln!(md, "### Next steps\n");
    let steps: &[&str] = if supported >= STRONG_THRESHOLD {
        &[
            "Strong evidence across the catalog",
            "Write up results with the full statistics above",
            "Plan replication with independent runs",
        ]
    } else if supported >= PUBLICATION_THRESHOLD {
        &[
            "Sufficient evidence for publication",
            "Update the results section with these statistics",
            "Revise the discussion around unsupported hypotheses",
        ]
    } else {
        &[
            "Below publication threshold",
            "Review failed and untestable hypotheses",
            "Consider more runs per condition or parameter adjustments",
        ]
    };
    for step in steps {
        let _ = writeln!(md, "- {step}");
    }
}

/// `report.md` → `report_stats.json` next to it.
pub fn stats_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    output.with_file_name(format!("{stem}_stats.json"))
}

/// Write the rendered report and the raw results next to it.
pub fn write_outputs(output: &Path, report: &str, results: &HypothesisResults) -> Result<PathBuf, ReportError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(output, report).map_err(|source| ReportError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let stats = stats_path(output);
    let raw = serde_json::to_string_pretty(results)?;
    std::fs::write(&stats, raw).map_err(|source| ReportError::Io {
        path: stats.clone(),
        source,
    })?;
    Ok(stats)
}
