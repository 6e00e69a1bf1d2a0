// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use std::{process::ExitCode, sync::Arc, time::Instant};

use jobmatch_lib::{db, JobId, JobStore, MatchFinder, MergeEngine, PgJobStore};

/// Fuzzy job matching, duplicate discovery and job merging for the job tracker.
#[derive(Parser, Debug)]
#[command(name = "jobmatch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Match an incoming (title, company) pair against stored jobs
    Match { title: String, company: String },
    /// List jobs that look like duplicates of a job, best first
    Duplicates { job_id: i64 },
    /// Merge the source job into the target job
    Merge {
        source_job_id: i64,
        target_job_id: i64,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Match { .. } => "match",
            Command::Duplicates { .. } => "duplicates",
            Command::Merge { .. } => "merge",
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

// Returns false when the command ran but was refused (failed merge)
async fn run(command: &Command, store: Arc<dyn JobStore>) -> Result<bool> {
    match command {
        Command::Match { title, company } => {
            let result = MatchFinder::new(store).match_incoming(title, company).await?;
            print_json(&result)?;
        }
        Command::Duplicates { job_id } => {
            let matches = MergeEngine::new(store)
                .find_potential_matches(JobId(*job_id))
                .await?;
            print_json(&matches)?;
        }
        Command::Merge {
            source_job_id,
            target_job_id,
        } => {
            let result = MergeEngine::new(store)
                .merge_jobs(JobId(*source_job_id), JobId(*target_job_id))
                .await?;
            print_json(&result)?;
            if !result.success {
                warn!("Merge refused: {}", result.message);
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Usage errors exit here, before any database work
    let cli = Cli::parse();

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Try to load .env file if it exists
    db::load_env(&[".env", ".env.local", "../.env"]);

    let pool = db::connect()
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool));

    let start_time = Instant::now();
    let ok = run(&cli.command, store).await?;
    info!(
        "'{}' completed in {:.2?}",
        cli.command.name(),
        start_time.elapsed()
    );

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
