use std::path::Path;

use chrono::Utc;
use hec_analysis::hypotheses::{AnalysisConfig, AnalysisInput, default_catalog};
use hec_analysis::report::{ReportContext, render_report, write_outputs};
use hec_analysis::runner::run_catalog;
use hec_core::store;
use hec_core::window::MIN_WINDOW_SIDE;
use serde_json::json;

use crate::util::{exit_error, exit_report, print_json};

pub fn run(data: &Path, output: &Path, pattern: &str, window_size: usize) -> i32 {
    if window_size < MIN_WINDOW_SIDE {
        exit_error(
            &format!("--window-size must be at least {MIN_WINDOW_SIDE}, got {window_size}"),
            Some("Post-death windows need that many decisions on each side"),
        );
    }

    let sessions = store::load(data, pattern).unwrap_or_else(|e| exit_report(e.report()));
    let mut groups = store::group_by_condition(sessions);
    let context = ReportContext::build(
        &mut groups,
        data.display().to_string(),
        pattern,
        window_size,
        Utc::now(),
    );

    let config = AnalysisConfig {
        window_size,
        ..AnalysisConfig::default()
    };
    let input = AnalysisInput::new(&groups, config);
    let results = run_catalog(&default_catalog(), &input);
    let report = render_report(&context, &results);

    let stats = match write_outputs(output, &report, &results) {
        Ok(stats) => stats,
        Err(e) => exit_error(
            &e.to_string(),
            Some("Check that the --output location is writable"),
        ),
    };

    print_json(&json!({
        "report": output.display().to_string(),
        "stats": stats.display().to_string(),
        "sessions": context.total_sessions(),
        "completed": results.completed_count(),
        "supported": results.supported_count(),
        "hypotheses": results.len(),
    }));
    0
}
