use std::fs;
use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info};
use thiserror::Error;

use heatgain::prelude::*;

#[derive(Debug, Parser)]
#[command(version, about = "Duct airflow and heat-gain acquisition")]
struct Cli {
    /// TOML configuration; written with defaults when missing.
    #[arg(long, default_value = "heatgain.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Acquire one record per tick until stopped.
    Run {
        /// Print cycle summaries without writing a data file.
        #[arg(long)]
        idle: bool,
        /// Data file name inside the data directory, instead of the day's next free name.
        #[arg(long, conflicts_with = "idle")]
        file: Option<String>,
        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Recalculate pre-recorded samples from a CSV table.
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Fixed duct diameter in inches, replacing the diameter column.
        #[arg(long)]
        duct_diameter: Option<f64>,
    },
    /// Check the calculators at fixed bench conditions.
    Selftest {
        /// Measured velocity pressure, inWc.
        #[arg(long)]
        velocity_pressure: f64,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("data directory: {0}")]
    Io(#[from] std::io::Error),
}

async fn acquire<S: RecordSink>(config: Config, sink: S, cycles: Option<u64>) {
    let device = Emulated::field_rig(&config.channels, &config.acquisition.room_dew_point);
    info!("No DAQ driver linked; acquiring from the emulated field rig");

    let mut scheduler = Scheduler::new(device, sink, config);
    match cycles {
        Some(cycles) => scheduler.run_cycles(cycles).await,
        None => scheduler.run().await,
    }
}

async fn execute(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Run { idle, file, cycles } => {
            let config = Config::load_or_default(&cli.config)?;

            if idle {
                info!("Idle mode, nothing is written");
                acquire(config, NullSink, cycles).await;
                return Ok(());
            }

            let data_dir = &config.logging.data_dir;
            let path = match file {
                Some(name) => {
                    fs::create_dir_all(data_dir)?;
                    data_dir.join(name)
                }
                None => next_data_file(data_dir, Local::now().date_naive()).map_err(|err| {
                    if let SinkError::NamesExhausted { .. } = err {
                        error!("Pass --file to pick a name explicitly");
                    }
                    err
                })?,
            };

            info!("Recording to {}", path.display());
            let sink = CsvSink::create(&path, &MeasurementRecord::header())?;
            acquire(config, sink, cycles).await;
        }
        Command::Batch {
            input,
            output,
            duct_diameter,
        } => {
            let config = if cli.config.exists() {
                Config::load(&cli.config)?
            } else {
                Config::default()
            };

            let mut batch = Batch::new(config.batch);
            if let Some(diameter) = duct_diameter {
                batch = batch.with_duct_diameter(diameter);
            }
            batch.run_files(input, output)?;
        }
        Command::Selftest { velocity_pressure } => {
            println!("{}", SelfTest::run(velocity_pressure));
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = execute(Cli::parse()).await {
        error!("{err}");
        std::process::exit(1);
    }
}
