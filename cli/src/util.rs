use hec_core::error::ErrorReport;
use serde::Serialize;
use serde_json::json;

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    let body = serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string());
    eprintln!("{body}");
    std::process::exit(1);
}

/// Exit with a library error report, keeping its message and hint.
pub fn exit_report(report: ErrorReport) -> ! {
    let message = match &report.path {
        Some(path) if !report.message.contains(path.as_str()) => format!("{} ({path})", report.message),
        _ => report.message.clone(),
    };
    exit_error(&message, report.docs_hint.as_deref())
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(e) => exit_error(&format!("Failed to serialize output: {e}"), None),
    }
}
