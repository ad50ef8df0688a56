use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::breakeven::solver::{solve, Solve, SolverMethod, UnreachableReason};
use crate::error::InvestRiskError;
use crate::evaluator::{base_metric_or_warn, evaluate_checked, EvalError, Evaluator};
use crate::model::BaseScenario;
use crate::parallel::ordered_map;
use crate::types::*;
use crate::InvestRiskResult;

pub const MAX_SOLVER_ITERATIONS: u32 = 10_000;

/// Break-even search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenConfig {
    /// Variable name -> metric value to solve for.
    pub targets: BTreeMap<String, f64>,
    /// Explicit `[search_min, search_max]` per variable.
    #[serde(default)]
    pub search_bounds: BTreeMap<String, (f64, f64)>,
    /// Variables without explicit bounds search `base * (1 ± fraction)`.
    #[serde(default = "default_search_fraction")]
    pub default_search_fraction: Fraction,
    /// Absolute tolerance on the metric.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub method: SolverMethod,
}

fn default_search_fraction() -> Fraction {
    0.9
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> u32 {
    200
}

/// A target with its search interval fixed.
#[derive(Debug, Clone)]
struct ResolvedTarget {
    name: String,
    base_value: f64,
    target_metric: f64,
    search_min: f64,
    search_max: f64,
}

impl BreakEvenConfig {
    pub fn new<'a>(targets: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        BreakEvenConfig {
            targets: targets
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            search_bounds: BTreeMap::new(),
            default_search_fraction: default_search_fraction(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            method: SolverMethod::default(),
        }
    }

    pub fn with_bounds(mut self, name: &str, search_min: f64, search_max: f64) -> Self {
        self.search_bounds
            .insert(name.to_string(), (search_min, search_max));
        self
    }

    pub fn validate(&self, base: &BaseScenario) -> InvestRiskResult<()> {
        self.resolve(base).map(|_| ())
    }

    fn resolve(&self, base: &BaseScenario) -> InvestRiskResult<Vec<ResolvedTarget>> {
        if self.targets.is_empty() {
            return Err(InvestRiskError::invalid(
                "breakeven.targets",
                "At least one target required",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(InvestRiskError::invalid(
                "breakeven.tolerance",
                "Tolerance must be positive",
            ));
        }
        if self.max_iterations == 0 || self.max_iterations > MAX_SOLVER_ITERATIONS {
            return Err(InvestRiskError::invalid(
                "breakeven.max_iterations",
                format!("Must be between 1 and {MAX_SOLVER_ITERATIONS}"),
            ));
        }
        if !(self.default_search_fraction.is_finite() && self.default_search_fraction > 0.0) {
            return Err(InvestRiskError::invalid(
                "breakeven.default_search_fraction",
                "Must be positive",
            ));
        }
        if let Some(name) = self.search_bounds.keys().find(|k| !self.targets.contains_key(*k)) {
            return Err(InvestRiskError::invalid(
                format!("search_bounds:{name}"),
                "Bounds given for a variable with no target",
            ));
        }

        self.targets
            .iter()
            .map(|(name, &target_metric)| {
                let field = format!("target:{name}");
                let base_value = base.require(name, &field)?;
                if !target_metric.is_finite() {
                    return Err(InvestRiskError::invalid(field, "Target metric must be finite"));
                }

                let (search_min, search_max) = match self.search_bounds.get(name) {
                    Some(&bounds) => bounds,
                    None if base_value == 0.0 => {
                        return Err(InvestRiskError::invalid(
                            field,
                            "Base value is zero; explicit search bounds are required",
                        ));
                    }
                    None => {
                        let a = base_value * (1.0 - self.default_search_fraction);
                        let b = base_value * (1.0 + self.default_search_fraction);
                        (a.min(b), a.max(b))
                    }
                };
                if !(search_min.is_finite() && search_max.is_finite()) || search_min >= search_max {
                    return Err(InvestRiskError::invalid(
                        format!("search_bounds:{name}"),
                        "Requires finite search_min < search_max",
                    ));
                }

                Ok(ResolvedTarget {
                    name: name.clone(),
                    base_value,
                    target_metric,
                    search_min,
                    search_max,
                })
            })
            .collect()
    }
}

/// How far an assumption must move to reach its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    /// Under 10%.
    Easy,
    /// 10% to 25%.
    Moderate,
    /// 25% to 50%.
    Challenging,
    /// Over 50%.
    Difficult,
    Unreachable,
}

impl Difficulty {
    /// Classify a solved break-even point by its distance from base.
    pub fn classify(breakeven_value: f64, base_value: f64) -> Self {
        match relative_change(breakeven_value, base_value) {
            Some(change) => {
                let change = change.abs();
                if change < 0.10 {
                    Difficulty::Easy
                } else if change <= 0.25 {
                    Difficulty::Moderate
                } else if change <= 0.50 {
                    Difficulty::Challenging
                } else {
                    Difficulty::Difficult
                }
            }
            None if breakeven_value == 0.0 => Difficulty::Easy,
            None => Difficulty::Difficult,
        }
    }
}

/// Break-even outcome for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenResult {
    pub name: String,
    pub base_value: f64,
    pub target_metric: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub breakeven_value: Option<f64>,
    /// Metric at `breakeven_value`; within tolerance of the target.
    pub achieved_metric: Option<f64>,
    pub percent_change_required: Option<Fraction>,
    pub difficulty: Difficulty,
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreachable_reason: Option<UnreachableReason>,
}

/// Output of break-even analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenOutput {
    pub metric_name: String,
    /// Informational; `None` when the base case itself failed.
    pub base_metric: Option<f64>,
    /// One per target that did not hit an evaluator error, in name order.
    pub results: Vec<BreakEvenResult>,
    /// Targets whose search hit an evaluator error.
    pub failures: Vec<VariableFailure>,
}

/// Solve, for each targeted assumption, the value at which the metric
/// equals its target with every other assumption held at base.
///
/// A target that cannot be bracketed inside its search bounds is reported
/// as `Unreachable`; it is not an error.
pub fn run_breakeven<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &BreakEvenConfig,
) -> InvestRiskResult<ComputationOutput<BreakEvenOutput>>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let targets = config.resolve(base)?;
    let base_metric = base_metric_or_warn(evaluator, base, &mut warnings);

    tracing::debug!(
        targets = targets.len(),
        method = ?config.method,
        "running break-even analysis"
    );

    let solved = ordered_map(&targets, |t| solve_target(base, evaluator, config, t));

    let mut results = Vec::with_capacity(targets.len());
    let mut failures = Vec::new();
    for (target, outcome) in targets.iter().zip(solved) {
        match outcome {
            Ok(result) => {
                if let Some(reason) = result.unreachable_reason {
                    warnings.push(format!(
                        "Break-even for '{}' unreachable in [{}, {}]: {reason:?}",
                        target.name, target.search_min, target.search_max
                    ));
                }
                results.push(result);
            }
            Err(e) => {
                tracing::warn!(variable = %target.name, error = %e, "break-even search failed");
                warnings.push(format!("Break-even for '{}' failed: {e}", target.name));
                failures.push(VariableFailure {
                    name: target.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if results.is_empty() {
        return Err(InvestRiskError::InsufficientData(
            "Every break-even search failed to evaluate".into(),
        ));
    }

    let output = BreakEvenOutput {
        metric_name: evaluator.metric_name().to_string(),
        base_metric,
        results,
        failures,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Break-Even Analysis (bracketed root finding)",
        &serde_json::json!({
            "num_targets": targets.len(),
            "method": config.method,
            "tolerance": config.tolerance,
            "max_iterations": config.max_iterations,
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn solve_target<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &BreakEvenConfig,
    target: &ResolvedTarget,
) -> Result<BreakEvenResult, EvalError>
where
    E: Evaluator + ?Sized,
{
    let objective = |x: f64| {
        let scenario = base
            .with_override(&target.name, x)
            .map_err(|e| EvalError::Failed(e.to_string()))?;
        Ok(evaluate_checked(evaluator, &scenario)? - target.target_metric)
    };

    let outcome = solve(
        objective,
        target.search_min,
        target.search_max,
        config.tolerance,
        config.max_iterations,
        config.method,
    )?;

    let mut result = BreakEvenResult {
        name: target.name.clone(),
        base_value: target.base_value,
        target_metric: target.target_metric,
        search_min: target.search_min,
        search_max: target.search_max,
        breakeven_value: None,
        achieved_metric: None,
        percent_change_required: None,
        difficulty: Difficulty::Unreachable,
        iterations: 0,
        unreachable_reason: None,
    };

    match outcome {
        Solve::Converged { x, fx, iterations } => {
            result.breakeven_value = Some(x);
            result.achieved_metric = Some(target.target_metric + fx);
            result.percent_change_required = relative_change(x, target.base_value);
            result.difficulty = Difficulty::classify(x, target.base_value);
            result.iterations = iterations;
        }
        Solve::Unreachable { reason, iterations } => {
            result.iterations = iterations;
            result.unreachable_reason = Some(reason);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scenario;

    fn base() -> BaseScenario {
        BaseScenario::from_pairs([("rent", 2000.0), ("vacancy", 0.05)]).unwrap()
    }

    fn annual_rent(s: &Scenario) -> Result<f64, EvalError> {
        Ok(s.value("rent")? * (1.0 - s.value("vacancy")?) * 12.0)
    }

    #[test]
    fn test_vacancy_breakeven() {
        let config = BreakEvenConfig::new([("vacancy", 20000.0)]).with_bounds("vacancy", 0.0, 0.5);
        let out = run_breakeven(&base(), &annual_rent, &config).unwrap().result;
        let r = &out.results[0];
        let v = r.breakeven_value.unwrap();
        assert!((v - 1.0 / 6.0).abs() < 1e-9);
        let check = annual_rent(&base().with_override("vacancy", v).unwrap()).unwrap();
        assert!((check - 20000.0).abs() <= config.tolerance);
        // 0.05 -> 0.1667 is more than a 50% move
        assert_eq!(r.difficulty, Difficulty::Difficult);
    }

    #[test]
    fn test_unreachable_target() {
        let config = BreakEvenConfig::new([("vacancy", 100000.0)]).with_bounds("vacancy", 0.0, 0.99);
        let out = run_breakeven(&base(), &annual_rent, &config).unwrap();
        let r = &out.result.results[0];
        assert_eq!(r.difficulty, Difficulty::Unreachable);
        assert_eq!(r.unreachable_reason, Some(UnreachableReason::NotBracketed));
        assert_eq!(r.breakeven_value, None);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_default_bounds_and_secant() {
        let mut config = BreakEvenConfig::new([("rent", 21000.0)]);
        config.method = SolverMethod::Secant;
        let out = run_breakeven(&base(), &annual_rent, &config).unwrap().result;
        let r = &out.results[0];
        assert_eq!(r.search_min, 2000.0 * (1.0 - 0.9));
        assert_eq!(r.search_max, 2000.0 * (1.0 + 0.9));
        let x = r.breakeven_value.unwrap();
        assert!((x - 21000.0 / (0.95 * 12.0)).abs() < 1e-6);
        assert_eq!(r.difficulty, Difficulty::Easy);
        assert!((r.percent_change_required.unwrap() - (x - 2000.0) / 2000.0).abs() < 1e-15);
    }

    #[test]
    fn test_failed_base_does_not_block_solvable_target() {
        let undefined_at_base = |s: &Scenario| -> Result<f64, EvalError> {
            if s.value("vacancy")? == 0.05 {
                return Err(EvalError::Failed("undefined at base".into()));
            }
            annual_rent(s)
        };
        let config = BreakEvenConfig::new([("vacancy", 20000.0)]).with_bounds("vacancy", 0.0, 0.5);
        let out = run_breakeven(&base(), &undefined_at_base, &config).unwrap();
        assert_eq!(out.result.base_metric, None);
        assert!(out.warnings[0].contains("undefined at base"), "{:?}", out.warnings);
        let v = out.result.results[0].breakeven_value.unwrap();
        assert!((v - 1.0 / 6.0).abs() < 1e-9);
        assert!(out.result.failures.is_empty());
    }

    #[test]
    fn test_difficulty_thresholds() {
        assert_eq!(Difficulty::classify(105.0, 100.0), Difficulty::Easy);
        assert_eq!(Difficulty::classify(90.0, 100.0), Difficulty::Moderate);
        assert_eq!(Difficulty::classify(125.0, 100.0), Difficulty::Moderate);
        assert_eq!(Difficulty::classify(60.0, 100.0), Difficulty::Challenging);
        assert_eq!(Difficulty::classify(151.0, 100.0), Difficulty::Difficult);
        assert_eq!(Difficulty::classify(0.0, 0.0), Difficulty::Easy);
        assert_eq!(Difficulty::classify(0.2, 0.0), Difficulty::Difficult);
    }

    #[test]
    fn test_zero_base_needs_bounds() {
        let base = BaseScenario::from_pairs([("rent", 2000.0), ("vacancy", 0.0)]).unwrap();
        let config = BreakEvenConfig::new([("vacancy", 20000.0)]);
        assert!(config.validate(&base).unwrap_err().is_configuration_error());
        let config = config.with_bounds("vacancy", 0.0, 0.5);
        let r = &run_breakeven(&base, &annual_rent, &config).unwrap().result.results[0];
        assert_eq!(r.percent_change_required, None);
        assert_eq!(r.difficulty, Difficulty::Difficult);
    }

    #[test]
    fn test_invalid_configs() {
        let b = base();
        let ok = BreakEvenConfig::new([("vacancy", 20000.0)]);
        assert!(ok.validate(&b).is_ok());

        let mut c = ok.clone();
        c.tolerance = 0.0;
        assert!(c.validate(&b).is_err());

        let mut c = ok.clone();
        c.max_iterations = MAX_SOLVER_ITERATIONS + 1;
        assert!(c.validate(&b).is_err());

        assert!(ok.clone().with_bounds("vacancy", 0.5, 0.1).validate(&b).is_err());
        assert!(ok.clone().with_bounds("rent", 0.0, 1.0).validate(&b).is_err());
        assert!(BreakEvenConfig::new([("vacnacy", 1.0)]).validate(&b).is_err());
        assert!(BreakEvenConfig::new([("vacancy", f64::INFINITY)]).validate(&b).is_err());
    }

    #[test]
    fn test_evaluator_failure_recorded() {
        let fragile = |s: &Scenario| -> Result<f64, EvalError> {
            let rent = s.value("rent")?;
            if rent > 3000.0 {
                return Err(EvalError::Overflow("rent".into()));
            }
            annual_rent(s)
        };
        let config = BreakEvenConfig::new([("rent", 30000.0), ("vacancy", 20000.0)])
            .with_bounds("vacancy", 0.0, 0.5);
        let out = run_breakeven(&base(), &fragile, &config).unwrap().result;
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].name, "rent");
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].name, "vacancy");
    }
}
