pub mod distributions;
pub mod hypotheses;
pub mod monitor;
pub mod report;
pub mod runner;
pub mod stats;
