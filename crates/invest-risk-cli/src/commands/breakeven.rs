use clap::{Args, ValueEnum};
use serde_json::Value;

use invest_risk_core::breakeven::{self, BreakEvenConfig, SolverMethod};

use crate::request::ModelRequest;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Bisection,
    Secant,
}

/// Arguments for break-even analysis
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to JSON/YAML request file (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Root-finding method
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Absolute tolerance on the metric
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Iteration cap per variable
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

pub fn run_breakeven(args: BreakEvenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest<BreakEvenConfig> = ModelRequest::load(args.input.as_deref(), "breakeven")?;
    let mut config = request.take_config("breakeven")?;
    if let Some(method) = args.method {
        config.method = match method {
            MethodArg::Bisection => SolverMethod::Bisection,
            MethodArg::Secant => SolverMethod::Secant,
        };
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    let result = breakeven::run_breakeven(&request.assumptions, &request.model, &config)?;
    Ok(serde_json::to_value(result)?)
}
