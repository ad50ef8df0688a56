use clap::Args;
use serde_json::Value;

use invest_risk_core::analysis::{self, AnalysisConfig};

use crate::request::ModelRequest;

/// Arguments for a combined analysis run
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON/YAML request file with an `analyses` section
    /// (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest<AnalysisConfig> = ModelRequest::load(args.input.as_deref(), "analyze")?;
    let config = request.take_config("analyze")?;
    let result = analysis::run_analysis(&request.assumptions, &request.model, &config)?;
    Ok(serde_json::to_value(result)?)
}
