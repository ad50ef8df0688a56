use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use crate::error::InvestRiskError;
use crate::evaluator::{base_metric_or_warn, evaluate_checked, Evaluator};
use crate::model::BaseScenario;
use crate::parallel::ordered_map;
use crate::sensitivity::range::{ResolvedAxis, SensitivityVariable};
use crate::types::*;
use crate::InvestRiskResult;

/// One-way sensitivity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoConfig {
    pub variables: Vec<SensitivityVariable>,
}

impl TornadoConfig {
    pub fn validate(&self, base: &BaseScenario) -> InvestRiskResult<()> {
        self.resolve(base).map(|_| ())
    }

    fn resolve(&self, base: &BaseScenario) -> InvestRiskResult<Vec<ResolvedAxis>> {
        if self.variables.is_empty() {
            return Err(InvestRiskError::invalid(
                "tornado.variables",
                "At least one variable required",
            ));
        }
        let mut seen = HashSet::new();
        for v in &self.variables {
            if !seen.insert(v.name.as_str()) {
                return Err(InvestRiskError::invalid(
                    format!("variable:{}", v.name),
                    "Variable listed more than once",
                ));
            }
        }
        self.variables.iter().map(|v| v.resolve(base)).collect()
    }
}

/// Metric recorded at one input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: f64,
    /// Relative to the base value; `None` when the base is zero.
    pub change_from_base: Option<Fraction>,
    pub metric: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tornado bar for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoEntry {
    pub name: String,
    pub base_value: f64,
    /// Input that produced `low_metric`.
    pub low_value: f64,
    /// Input that produced `high_metric`.
    pub high_value: f64,
    pub low_metric: f64,
    pub high_metric: f64,
    pub swing: f64,
    /// 1 = largest swing.
    pub rank: usize,
    pub points: Vec<SensitivityPoint>,
}

/// Output of one-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoOutput {
    pub metric_name: String,
    /// `None` when the base case itself failed; see `warnings`.
    pub base_metric: Option<f64>,
    /// Sorted by swing, descending.
    pub entries: Vec<TornadoEntry>,
    /// Variables where every point failed; not ranked.
    pub failed_variables: Vec<VariableFailure>,
}

/// Run one-way ("tornado") sensitivity analysis.
///
/// Each variable is perturbed on its own with every other assumption held
/// at base. The low/high metrics are the extremes over the whole range, so
/// non-monotonic models are handled. Ties in swing keep input order.
pub fn run_tornado<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &TornadoConfig,
) -> InvestRiskResult<ComputationOutput<TornadoOutput>>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let axes = config.resolve(base)?;
    let base_metric = base_metric_or_warn(evaluator, base, &mut warnings);

    tracing::debug!(variables = axes.len(), ?base_metric, "running tornado analysis");

    let mut entries = Vec::with_capacity(axes.len());
    let mut failed_variables = Vec::new();

    for axis in &axes {
        let points = evaluate_axis(base, evaluator, axis, base_metric)?;

        let failures = points.iter().filter(|p| p.metric.is_none()).count();
        if failures > 0 {
            tracing::warn!(variable = %axis.name, failures, "tornado points failed");
            warnings.push(format!(
                "Variable '{}': {failures} of {} points failed to evaluate",
                axis.name,
                points.len()
            ));
        }

        match extremes(&points) {
            Some(((low, low_metric), (high, high_metric))) => {
                entries.push(TornadoEntry {
                    name: axis.name.clone(),
                    base_value: axis.base_value,
                    low_value: points[low].value,
                    high_value: points[high].value,
                    low_metric,
                    high_metric,
                    swing: high_metric - low_metric,
                    rank: 0,
                    points,
                });
            }
            None => {
                let reason = points
                    .iter()
                    .find_map(|p| p.error.clone())
                    .unwrap_or_else(|| "no points evaluated".into());
                failed_variables.push(VariableFailure {
                    name: axis.name.clone(),
                    reason,
                });
            }
        }
    }

    if entries.is_empty() {
        return Err(InvestRiskError::InsufficientData(
            "Every tornado variable failed to evaluate".into(),
        ));
    }

    // Stable: equal swings keep input order.
    entries.sort_by(|a, b| b.swing.partial_cmp(&a.swing).unwrap_or(Ordering::Equal));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }

    let output = TornadoOutput {
        metric_name: evaluator.metric_name().to_string(),
        base_metric,
        entries,
        failed_variables,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-Way Sensitivity (Tornado)",
        &serde_json::json!({
            "variables": axes.iter().map(|a| &a.name).collect::<Vec<_>>(),
            "points": axes.iter().map(|a| a.values.len()).sum::<usize>(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn evaluate_axis<E>(
    base: &BaseScenario,
    evaluator: &E,
    axis: &ResolvedAxis,
    base_metric: Option<f64>,
) -> InvestRiskResult<Vec<SensitivityPoint>>
where
    E: Evaluator + ?Sized,
{
    let scenarios = axis
        .values
        .iter()
        .map(|&v| base.with_override(&axis.name, v))
        .collect::<InvestRiskResult<Vec<_>>>()?;

    let metrics = ordered_map(&scenarios, |s| evaluate_checked(evaluator, s));

    Ok(axis
        .values
        .iter()
        .zip(metrics)
        .map(|(&value, metric)| {
            // The base point reproduces the base metric exactly.
            let metric = match base_metric {
                Some(m) if value == axis.base_value => Ok(m),
                _ => metric,
            };
            let (metric, error) = match metric {
                Ok(m) => (Some(m), None),
                Err(e) => (None, Some(e.to_string())),
            };
            SensitivityPoint {
                value,
                change_from_base: relative_change(value, axis.base_value),
                metric,
                error,
            }
        })
        .collect())
}

/// Index and metric of the first minimum and first maximum successful point.
fn extremes(points: &[SensitivityPoint]) -> Option<((usize, f64), (usize, f64))> {
    let mut low: Option<(usize, f64)> = None;
    let mut high: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
        let Some(m) = p.metric else { continue };
        if low.map_or(true, |(_, l)| m < l) {
            low = Some((i, m));
        }
        if high.map_or(true, |(_, h)| m > h) {
            high = Some((i, m));
        }
    }
    Some((low?, high?))
}
