use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::error::InvestRiskError;
use crate::evaluator::{evaluate_checked, Evaluator};
use crate::model::BaseScenario;
use crate::parallel::ordered_map;
use crate::types::*;
use crate::InvestRiskResult;

const PROBABILITY_TOLERANCE: f64 = 0.001;

/// A named partial override of the base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScenario {
    pub name: String,
    /// Assumptions not listed here stay at base.
    #[serde(default)]
    pub overrides: BTreeMap<String, f64>,
    /// Either every scenario carries a probability or none does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl NamedScenario {
    pub fn new<'a>(name: impl Into<String>, overrides: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        NamedScenario {
            name: name.into(),
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            probability: None,
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }
}

/// Which scenario wins when several share the best (or worst) metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earliest in input order.
    #[default]
    First,
    /// Latest in input order.
    Last,
}

/// Scenario comparison configuration; order matters for tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenarios: Vec<NamedScenario>,
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl ScenarioConfig {
    pub fn new(scenarios: Vec<NamedScenario>) -> Self {
        ScenarioConfig {
            scenarios,
            tie_break: TieBreak::default(),
        }
    }

    pub fn validate(&self, base: &BaseScenario) -> InvestRiskResult<()> {
        if self.scenarios.is_empty() {
            return Err(InvestRiskError::invalid(
                "scenarios",
                "At least one scenario required",
            ));
        }

        let mut names = HashSet::new();
        for s in &self.scenarios {
            if s.name.trim().is_empty() {
                return Err(InvestRiskError::invalid("scenarios", "Scenario names must not be empty"));
            }
            if !names.insert(s.name.as_str()) {
                return Err(InvestRiskError::invalid(
                    format!("scenario:{}", s.name),
                    "Duplicate scenario name",
                ));
            }
            base.with_overrides(&s.overrides)
                .map_err(|e| InvestRiskError::invalid(format!("scenario:{}", s.name), e.to_string()))?;
        }

        let with_probability = self.scenarios.iter().filter(|s| s.probability.is_some()).count();
        if with_probability == 0 {
            return Ok(());
        }
        if with_probability != self.scenarios.len() {
            return Err(InvestRiskError::invalid(
                "probabilities",
                "Either every scenario has a probability or none does",
            ));
        }
        for s in &self.scenarios {
            let p = s.probability.unwrap_or_default();
            if !(0.0..=1.0).contains(&p) {
                return Err(InvestRiskError::invalid(
                    format!("scenario:{} probability", s.name),
                    "Probability must be between 0 and 1",
                ));
            }
        }
        let total: f64 = self.scenarios.iter().filter_map(|s| s.probability).sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(InvestRiskError::invalid(
                "probabilities",
                format!("Probabilities must sum to 1.0 (got {total})"),
            ));
        }
        Ok(())
    }
}

/// Result for a single scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub metric_value: Option<f64>,
    /// `metric_value - base_metric`, exactly.
    pub delta_from_base: Option<f64>,
    /// `None` when the base metric is ~0 or the scenario failed.
    pub percent_change_from_base: Option<Fraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output of scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparisonOutput {
    pub metric_name: String,
    pub base_metric: f64,
    pub results: Vec<ScenarioResult>,
    pub best_case: Option<String>,
    pub worst_case: Option<String>,
    /// Present when probabilities were supplied and every weighted scenario
    /// evaluated.
    pub probability_weighted_value: Option<f64>,
}

/// Evaluate each named scenario and compare it with the base case.
pub fn run_scenarios<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &ScenarioConfig,
) -> InvestRiskResult<ComputationOutput<ScenarioComparisonOutput>>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate(base)?;
    let base_metric =
        evaluate_checked(evaluator, &base.scenario()).map_err(|source| InvestRiskError::Evaluation {
            context: "base scenario".into(),
            source,
        })?;

    tracing::debug!(scenarios = config.scenarios.len(), base_metric, "comparing scenarios");

    let merged = config
        .scenarios
        .iter()
        .map(|s| base.with_overrides(&s.overrides))
        .collect::<InvestRiskResult<Vec<_>>>()?;
    let metrics = ordered_map(&merged, |s| evaluate_checked(evaluator, s));

    if base_metric.abs() < crate::ZERO_EPSILON {
        warnings.push("Base metric is zero; percent changes are undefined".into());
    }

    let mut results = Vec::with_capacity(config.scenarios.len());
    for (scenario, metric) in config.scenarios.iter().zip(metrics) {
        let result = match metric {
            Ok(value) => ScenarioResult {
                scenario_name: scenario.name.clone(),
                metric_value: Some(value),
                delta_from_base: Some(value - base_metric),
                percent_change_from_base: relative_change(value, base_metric),
                probability: scenario.probability,
                error: None,
            },
            Err(e) => {
                tracing::warn!(scenario = %scenario.name, error = %e, "scenario failed");
                warnings.push(format!("Scenario '{}' failed to evaluate: {e}", scenario.name));
                ScenarioResult {
                    scenario_name: scenario.name.clone(),
                    metric_value: None,
                    delta_from_base: None,
                    percent_change_from_base: None,
                    probability: scenario.probability,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(result);
    }

    if results.iter().all(|r| r.metric_value.is_none()) {
        return Err(InvestRiskError::InsufficientData(
            "Every scenario failed to evaluate".into(),
        ));
    }

    let best_case = pick(&results, config.tie_break, |candidate, current| candidate > current);
    let worst_case = pick(&results, config.tie_break, |candidate, current| candidate < current);

    let probability_weighted_value = if results.iter().any(|r| r.probability.is_some()) {
        let lost_mass: f64 = results
            .iter()
            .filter(|r| r.metric_value.is_none())
            .filter_map(|r| r.probability)
            .sum();
        if lost_mass > 0.0 {
            warnings.push(format!(
                "Failed scenarios carry {lost_mass} probability; probability-weighted value omitted"
            ));
            None
        } else {
            Some(
                results
                    .iter()
                    .filter_map(|r| Some(r.probability? * r.metric_value?))
                    .sum(),
            )
        }
    } else {
        None
    };

    let output = ScenarioComparisonOutput {
        metric_name: evaluator.metric_name().to_string(),
        base_metric,
        results,
        best_case,
        worst_case,
        probability_weighted_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Named Scenario Comparison",
        &serde_json::json!({
            "num_scenarios": config.scenarios.len(),
            "base_metric": base_metric,
            "tie_break": config.tie_break,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Name of the scenario `better` prefers, honouring the tie-break rule.
fn pick(results: &[ScenarioResult], tie_break: TieBreak, better: impl Fn(f64, f64) -> bool) -> Option<String> {
    let mut chosen: Option<(&str, f64)> = None;
    for r in results {
        let Some(m) = r.metric_value else { continue };
        let replace = match chosen {
            None => true,
            Some((_, current)) => better(m, current) || (tie_break == TieBreak::Last && m == current),
        };
        if replace {
            chosen = Some((&r.scenario_name, m));
        }
    }
    chosen.map(|(name, _)| name.to_string())
}
