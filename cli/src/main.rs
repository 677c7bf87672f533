use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "hec",
    version,
    about = "Record, monitor and analyze cognition experiment sessions"
)]
struct Cli {
    /// Emit logs as JSON lines instead of compact text
    #[arg(long, global = true, env = "HEC_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test the hypothesis catalog against persisted sessions and write a report
    Analyze {
        /// Directory sessions were persisted to
        #[arg(long, env = "HEC_DATA_DIR", default_value = hec_core::experiment::DEFAULT_DATA_DIR)]
        data: PathBuf,
        /// Markdown report path; raw results land next to it as *_stats.json
        #[arg(long, env = "HEC_OUTPUT", default_value = "hypothesis_report.md")]
        output: PathBuf,
        /// Session id glob ('*' any run, '?' one character)
        #[arg(long, env = "HEC_PATTERN", default_value = "*")]
        pattern: String,
        /// Decisions compared on each side of a death
        #[arg(long, env = "HEC_WINDOW_SIZE", default_value_t = hec_core::window::DEFAULT_WINDOW_SIZE)]
        window_size: usize,
    },
    /// Watch a data directory and flag unhealthy sessions (Ctrl-C to stop)
    Monitor {
        #[arg(long, env = "HEC_DATA_DIR", default_value = hec_core::experiment::DEFAULT_DATA_DIR)]
        data: PathBuf,
        /// Seconds between snapshots
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
    /// Generate synthetic sessions for every batch condition
    Simulate {
        #[arg(long, env = "HEC_DATA_DIR", default_value = hec_core::experiment::DEFAULT_DATA_DIR)]
        data: PathBuf,
        /// Runs per condition
        #[arg(long, default_value_t = 5)]
        runs: usize,
        /// Ticks per run
        #[arg(long, default_value_t = 600)]
        ticks: usize,
        /// Base RNG seed; run i of a condition uses an offset of it
        #[arg(long)]
        seed: Option<u64>,
        /// Prefix of generated session ids
        #[arg(long, default_value = "sim")]
        base_id: String,
    },
    /// Show the capability presets of each condition
    Conditions,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hec=info,hec_core=info,hec_analysis=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let code = match cli.command {
        Commands::Analyze {
            data,
            output,
            pattern,
            window_size,
        } => commands::analyze::run(&data, &output, &pattern, window_size),
        Commands::Monitor {
            data,
            interval_secs,
        } => commands::monitor::run(&data, interval_secs).await,
        Commands::Simulate {
            data,
            runs,
            ticks,
            seed,
            base_id,
        } => commands::simulate::run(&data, runs, ticks, seed, &base_id),
        Commands::Conditions => commands::conditions::run(),
    };

    std::process::exit(code);
}
