use clap::{Args, ValueEnum};
use serde_json::Value;

use invest_risk_core::scenarios::{self, ScenarioConfig, TieBreak};

use crate::request::ModelRequest;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TieBreakArg {
    First,
    Last,
}

/// Arguments for named scenario comparison
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to JSON/YAML request file (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Which scenario wins a best/worst tie
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreakArg>,
}

pub fn run_scenarios(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest<ScenarioConfig> = ModelRequest::load(args.input.as_deref(), "scenarios")?;
    let mut config = request.take_config("scenarios")?;
    if let Some(tie_break) = args.tie_break {
        config.tie_break = match tie_break {
            TieBreakArg::First => TieBreak::First,
            TieBreakArg::Last => TieBreak::Last,
        };
    }
    let result = scenarios::run_scenarios(&request.assumptions, &request.model, &config)?;
    Ok(serde_json::to_value(result)?)
}
