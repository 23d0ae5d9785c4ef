use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use super::{config_from_value, run_http_server, run_projection, run_simulation, today};
use crate::core::{
    CancellationToken, MonteCarloConfig, MonthlyCompounding, ReportingMode, SimulationConfig,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliReporting {
    Yearly,
    January,
}

impl From<CliReporting> for ReportingMode {
    fn from(value: CliReporting) -> Self {
        match value {
            CliReporting::Yearly => ReportingMode::YearlyFromStart,
            CliReporting::January => ReportingMode::CalendarJanuary,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliCompounding {
    Geometric,
    Simple,
}

impl From<CliCompounding> for MonthlyCompounding {
    fn from(value: CliCompounding) -> Self {
        match value {
            CliCompounding::Geometric => MonthlyCompounding::Geometric,
            CliCompounding::Simple => MonthlyCompounding::Simple,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fire-planner",
    about = "FIRE retirement projection and Monte Carlo survival estimator"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = "info", help = "Log level when RUST_LOG is unset")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run the deterministic projection and print snapshots and milestones.
    Project {
        #[arg(long, help = "Path to a SimulationConfig JSON file")]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = CliReporting::Yearly)]
        reporting: CliReporting,
    },
    /// Run the Monte Carlo engine and print the aggregate and percentile bands.
    MonteCarlo {
        #[arg(long, help = "Path to a SimulationConfig JSON file")]
        config: PathBuf,
        #[arg(long, default_value_t = 1_000)]
        runs: u32,
        #[arg(long, default_value_t = 0.07, help = "Mean annual return, e.g. 0.07")]
        mean: f64,
        #[arg(long, default_value_t = 0.15, help = "Annual return standard deviation")]
        stdev: f64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = CliCompounding::Geometric)]
        compounding: CliCompounding,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .with_context(|| format!("HTTP server on port {port} failed")),
        Command::Project { config, reporting } => {
            let config = load_config(&config)?;
            let response = run_projection(&config, reporting.into())?;
            info!(rows = response.snapshots.len(), "projection finished");
            print_json(&response)
        }
        Command::MonteCarlo {
            config,
            runs,
            mean,
            stdev,
            seed,
            compounding,
        } => {
            let config = load_config(&config)?;
            let settings = MonteCarloConfig {
                mean_return: mean,
                std_dev: stdev,
                num_runs: runs,
                seed,
                compounding: compounding.into(),
            };
            let response = run_simulation(&config, &settings, &CancellationToken::new())?;
            info!(
                success_rate = response.result.success_rate,
                "Monte Carlo simulation finished"
            );
            print_json(&response)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<SimulationConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    config_from_value(value, today()).map_err(|msg| anyhow!("{}: {msg}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
