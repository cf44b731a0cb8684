//! Gazeline CLI - drives the pipeline over a folder of experiment data
//!
//! Commands:
//! - tests: list the experiment folders under the data root
//! - stats: load one test and print its per-trial statistics
//! - table: render one test's trials as delimited text
//! - update: reconcile the statistics store and compute requested folders

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use gazeline::stats;
use gazeline::{Pipeline, PipelineConfig, StatisticsStore, GAZELINE_VERSION};

/// Gazeline - statistics over reconciled trial and gaze logs
#[derive(Parser)]
#[command(name = "gazeline")]
#[command(version = GAZELINE_VERSION)]
#[command(about = "Reconcile behavioral trial logs with eye-tracker exports", long_about = None)]
struct Cli {
    /// Root folder holding one subfolder per experiment
    #[arg(short, long, default_value = "./data")]
    data_root: PathBuf,

    /// Hour offset between the trial log and gaze export clocks
    #[arg(short = 't', long, default_value_t = 2)]
    time_correction: i64,

    /// Statistics database file
    #[arg(long, default_value = "gazeline-db.json")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the experiment folders
    Tests,

    /// Compute and print the statistics of every trial in a test
    Stats {
        /// Experiment folder name
        test: String,
    },

    /// Render a test's trials as a delimited table
    Table {
        /// Experiment folder name
        test: String,
    },

    /// Reconcile the statistics store against the data folders
    Update,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pipeline = Pipeline::new(PipelineConfig {
        data_root: cli.data_root.clone(),
        time_correction: cli.time_correction,
    });

    let result = match cli.command {
        Commands::Tests => run_tests(&pipeline),
        Commands::Stats { test } => run_stats(&pipeline, &test),
        Commands::Table { test } => run_table(&pipeline, &test),
        Commands::Update => run_update(&pipeline, &cli.db),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err);
            ExitCode::FAILURE
        }
    }
}

fn run_tests(pipeline: &Pipeline) -> Result<(), gazeline::PipelineError> {
    for name in pipeline.tests()? {
        println!("{name}");
    }
    Ok(())
}

fn run_stats(pipeline: &Pipeline, test: &str) -> Result<(), gazeline::PipelineError> {
    let test = pipeline.load_test(test)?;

    for trial in &test.trials {
        match stats::calculate(trial, None, None) {
            Some(statistics) => {
                println!("{}", serde_json::to_string_pretty(&statistics)?);
            }
            None => warn!(trial = %trial.id, "no gaze data, no statistics"),
        }
    }

    Ok(())
}

fn run_table(pipeline: &Pipeline, test: &str) -> Result<(), gazeline::PipelineError> {
    let test = pipeline.load_test(test)?;

    let mut stats_by_id = BTreeMap::new();
    for trial in &test.trials {
        if let Some(statistics) = stats::calculate(trial, None, None) {
            stats_by_id.insert(trial.id.clone(), statistics);
        }
    }

    println!("{}", test.trials_as_table(&stats_by_id));
    Ok(())
}

fn run_update(pipeline: &Pipeline, db: &PathBuf) -> Result<(), gazeline::PipelineError> {
    let mut store = StatisticsStore::open(db, &pipeline.config().data_root)?;

    let report = store.update()?;
    println!("removed: {}, appended: {}", report.removed, report.appended);

    for name in &report.requested {
        match pipeline.compute_folder(&mut store, name) {
            Ok(count) => println!("{name}: {count} trials"),
            // a broken folder should not stop the rest of the sweep
            Err(err) => warn!(folder = %name, %err, "skipping folder"),
        }
    }

    Ok(())
}
