pub mod analyze;
pub mod conditions;
pub mod monitor;
pub mod simulate;
