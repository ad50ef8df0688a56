use clap::Args;
use serde_json::Value;

use invest_risk_core::monte_carlo::{self, MonteCarloConfig};

use crate::request::ModelRequest;

/// Arguments for Monte Carlo simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON/YAML request file (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of iterations
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Override the RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include every successful metric in the output
    #[arg(long)]
    pub samples: bool,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest<MonteCarloConfig> =
        ModelRequest::load(args.input.as_deref(), "monte-carlo")?;
    let mut config = request.take_config("monte-carlo")?;
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.retain_samples |= args.samples;

    let result = monte_carlo::run_monte_carlo(&request.assumptions, &request.model, &config)?;
    Ok(serde_json::to_value(result)?)
}
