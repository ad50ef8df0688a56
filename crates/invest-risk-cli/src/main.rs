mod commands;
mod input;
mod logging;
mod output;
mod request;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::AnalyzeArgs;
use commands::breakeven::BreakEvenArgs;
use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::ScenarioArgs;
use commands::sensitivity::{HeatmapArgs, TornadoArgs};

/// Sensitivity and risk analysis for investment models
#[derive(Parser)]
#[command(
    name = "irisk",
    version,
    about = "Sensitivity and risk analysis for investment models",
    long_about = "Stress-test an investment model against its assumptions: one-way \
                  (tornado) and two-way (heat map) sensitivity, Monte Carlo simulation, \
                  named scenario comparison, and break-even search. Requests are JSON \
                  or YAML files naming a built-in model, its base assumptions and the \
                  analysis config."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run several analyses on one model and collect a combined report
    Analyze(AnalyzeArgs),
    /// One-way sensitivity, ranked by swing
    Tornado(TornadoArgs),
    /// Two-way sensitivity grid
    Heatmap(HeatmapArgs),
    /// Monte Carlo simulation of the model's metric
    MonteCarlo(MonteCarloArgs),
    /// Compare named scenarios against the base case
    Scenarios(ScenarioArgs),
    /// Solve for the assumption values that hit a target metric
    Breakeven(BreakEvenArgs),
    /// List built-in models and their required assumptions
    Models,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Tornado(args) => commands::sensitivity::run_tornado(args),
        Commands::Heatmap(args) => commands::sensitivity::run_heatmap(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Breakeven(args) => commands::breakeven::run_breakeven(args),
        Commands::Models => commands::models::run_models(),
        Commands::Version => {
            println!("irisk {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
