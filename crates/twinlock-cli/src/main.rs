//! twinlock host simulator.
//!
//! Runs the authority and interface controllers in one process, joined by an
//! in-memory serial link, with timers paced by the tokio clock.

mod simulate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "twinlock")]
#[command(about = "Two-controller gate access system simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both controllers against simulated peripherals
    Simulate {
        /// JSON controller configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Speed factor for every timer (2.0 runs twice as fast)
        #[arg(short, long, default_value_t = 1.0)]
        time_scale: f64,

        /// Bound every link wait; waits forever when omitted
        #[arg(long)]
        wait_timeout_ms: Option<u64>,

        /// Scripted keypad line, Enter appended; repeatable. Stdin is not read
        /// when given.
        #[arg(short, long)]
        keys: Vec<String>,

        /// Credential already stored on the authority at boot
        #[arg(short, long)]
        preset: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twinlock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            time_scale,
            wait_timeout_ms,
            keys,
            preset,
        } => {
            simulate::run(simulate::Options {
                config,
                time_scale,
                wait_timeout_ms,
                keys,
                preset,
            })
            .await
        }
    }
}
