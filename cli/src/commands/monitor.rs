use std::path::Path;
use std::time::{Duration, Instant};

use hec_analysis::monitor::{render_dashboard, snapshot_directory};

use crate::util::exit_error;

pub async fn run(data: &Path, interval_secs: u64) -> i32 {
    if interval_secs == 0 {
        exit_error("--interval-secs must be at least 1", None);
    }

    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!(data = %data.display(), interval_secs, "Monitoring started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match snapshot_directory(data) {
                    Ok(snapshot) => {
                        // Clear the terminal before redrawing
                        print!("\x1b[2J\x1b[H");
                        println!("{}", render_dashboard(&snapshot, started.elapsed()));
                        println!("Refreshing every {interval_secs}s. Press Ctrl-C to stop.");
                    }
                    Err(e) => tracing::warn!(error = %e, "Snapshot failed"),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    println!("\nMonitoring stopped.");
    tracing::info!(elapsed_secs = started.elapsed().as_secs(), "Monitoring stopped");
    0
}
