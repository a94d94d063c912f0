use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod runner;
mod scenario;

use runner::RunOptions;
use scenario::Scenario;

#[derive(Parser, Debug, Clone)]
#[command(name = "vp-leash-sim", about = "Replay leash scenarios against an in-memory voice host")]
struct Args {
    /// Scenario JSON file
    #[arg(long, env = "VP_LEASH_SCENARIO")]
    scenario: PathBuf,

    /// Write JSON report to this path
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Delivery rounds allowed per step before giving up on settling
    #[arg(long, default_value_t = 8)]
    max_rounds: usize,

    /// Leash actor mailbox size
    #[arg(long, default_value_t = vp_leash::DEFAULT_MAILBOX)]
    mailbox: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw).context("parsing scenario")?;

    let report = runner::run(scenario, RunOptions { max_rounds: args.max_rounds, mailbox: args.mailbox }).await?;

    for step in &report.steps {
        for n in &step.notifications {
            info!(step = step.index, severity = ?n.severity, "{}", n.message);
        }
    }
    info!(
        joins = report.total_joins,
        disconnects = report.total_disconnects,
        channel = report.final_channel.as_deref().unwrap_or("-"),
        handler = report.final_handler.as_deref().unwrap_or("-"),
        "scenario done"
    );

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
