use hec_core::condition::Condition;
use hec_core::experiment::ExperimentConfig;
use serde_json::json;

use crate::util::print_json;

pub fn run() -> i32 {
    let table: Vec<_> = Condition::KNOWN
        .into_iter()
        .filter_map(|condition| ExperimentConfig::for_condition(condition, None))
        .map(|config| {
            json!({
                "condition": config.condition,
                "label": config.condition.label(),
                "summary": config.summary_line(),
                "capabilities": config.capabilities(),
                "rumination": config.rumination_active(),
                "meta_cognition": config.meta_cognition_active(),
            })
        })
        .collect();
    print_json(&table);
    0
}
