// src/main.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod adjustments;
mod attendance;
mod clock;
mod config;
mod engine;
mod error;
mod limits;
mod model;
mod scheduler;
mod swaps;
mod validation;
mod wellbeing;

#[cfg(test)]
mod testutil;

#[cfg(test)]
mod swap_tests;
#[cfg(test)]
mod validation_tests;
#[cfg(test)]
mod wellbeing_tests;

use clock::SystemClock;
use config::EngineConfig;
use engine::ShiftEngine;

#[derive(Parser)]
#[command(
    name = "shiftly-core",
    about = "Shift lifecycle and attendance engine maintenance commands"
)]
struct Cli {
    /// JSON snapshot file holding the engine state.
    #[arg(long, default_value = "shiftly_state.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Auto-validate completed, still-pending shifts for a business day
    /// (default: yesterday). Intended to be triggered by an external
    /// scheduler.
    AutoValidate {
        #[arg(long)]
        business: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Flag assigned, confirmed shifts that were never punched on a given
    /// day.
    FlagMissing {
        #[arg(long)]
        business: String,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Mark the given shifts ManuallyApproved with an approver stamp.
    BatchApprove {
        #[arg(long)]
        business: String,
        #[arg(long)]
        approver: String,
        /// Shift ids to approve.
        shift_ids: Vec<String>,
    },
    /// Print the wellbeing aggregates for an employee.
    Wellbeing {
        #[arg(long)]
        employee: String,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));
    fmt().with_env_filter(filter).init();
    info!("Tracing subscriber initialized.");

    let config = EngineConfig::from_env().context("loading engine configuration from env")?;
    let cli = Cli::parse();

    let engine = ShiftEngine::new(Arc::new(SystemClock), config);
    if cli.store.exists() {
        engine
            .load_snapshot(&cli.store)
            .with_context(|| format!("loading snapshot {}", cli.store.display()))?;
    } else {
        info!(
            "No snapshot at {}; starting with an empty engine.",
            cli.store.display()
        );
    }

    match cli.command {
        Command::AutoValidate { business, date } => {
            let validated = engine.auto_validate_shifts(&business, date);
            println!("Auto-validated {} shifts for business {}", validated, business);
            engine.save_snapshot(&cli.store)?;
        }
        Command::FlagMissing { business, date } => {
            let flagged = engine.flag_missing_check_ins(&business, date);
            println!(
                "Flagged {} missing check-ins for business {} on {}",
                flagged, business, date
            );
            engine.save_snapshot(&cli.store)?;
        }
        Command::BatchApprove {
            business,
            approver,
            shift_ids,
        } => {
            let approved = engine.batch_approve_shifts(&business, &shift_ids, &approver);
            println!(
                "Approved {} of {} shifts for business {}",
                approved,
                shift_ids.len(),
                business
            );
            engine.save_snapshot(&cli.store)?;
        }
        Command::Wellbeing { employee } => {
            let stats = engine.wellbeing_stats(&employee);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
