use clap::Args;
use serde_json::Value;

use invest_risk_core::sensitivity::{self, HeatMapConfig, SensitivityVariable, TornadoConfig};

use crate::request::ModelRequest;

/// Arguments for one-way (tornado) sensitivity
#[derive(Args)]
pub struct TornadoArgs {
    /// Path to JSON/YAML request file (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Sweep a variable, format name:min:max:step
    /// (e.g. "vacancy_rate:0.0:0.2:0.05"). Repeatable; replaces the
    /// request's config when given.
    #[arg(long = "var")]
    pub vars: Vec<String>,
}

/// Arguments for two-way (heat map) sensitivity
#[derive(Args)]
pub struct HeatmapArgs {
    /// Path to JSON/YAML request file (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Row variable in format name:min:max:step
    #[arg(long, requires = "var2")]
    pub var1: Option<String>,

    /// Column variable in format name:min:max:step
    #[arg(long, requires = "var1")]
    pub var2: Option<String>,
}

fn parse_sweep_var(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    Ok(SensitivityVariable::sweep(
        parts[0],
        parts[1].parse()?,
        parts[2].parse()?,
        parts[3].parse()?,
    ))
}

pub fn run_tornado(args: TornadoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest<TornadoConfig> = ModelRequest::load(args.input.as_deref(), "tornado")?;
    let config = if args.vars.is_empty() {
        request.take_config("tornado")?
    } else {
        TornadoConfig {
            variables: args
                .vars
                .iter()
                .map(|v| parse_sweep_var(v))
                .collect::<Result<_, _>>()?,
        }
    };
    let result = sensitivity::run_tornado(&request.assumptions, &request.model, &config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_heatmap(args: HeatmapArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest<HeatMapConfig> = ModelRequest::load(args.input.as_deref(), "heatmap")?;
    let config = match (&args.var1, &args.var2) {
        (Some(v1), Some(v2)) => HeatMapConfig {
            var1: parse_sweep_var(v1)?,
            var2: parse_sweep_var(v2)?,
        },
        _ => request.take_config("heatmap")?,
    };
    let result = sensitivity::run_heatmap(&request.assumptions, &request.model, &config)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invest_risk_core::sensitivity::SensitivityRange;

    #[test]
    fn test_parse_sweep_var() {
        let v = parse_sweep_var("vacancy_rate:0.0:0.2:0.05").unwrap();
        assert_eq!(v.name, "vacancy_rate");
        assert_eq!(
            v.range,
            SensitivityRange::Sweep { min: 0.0, max: 0.2, step: 0.05 }
        );
    }

    #[test]
    fn test_parse_sweep_var_errors() {
        assert!(parse_sweep_var("vacancy_rate:0.0:0.2").is_err());
        assert!(parse_sweep_var("vacancy_rate:a:0.2:0.05").is_err());
    }
}
