use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::InvestRiskError;
use crate::evaluator::{evaluate_checked, EvalError, Evaluator};
use crate::model::BaseScenario;
use crate::monte_carlo::distribution::{DistributionSpec, Sampler};
use crate::monte_carlo::statistics::*;
use crate::parallel::{ordered_map, sequential_map};
use crate::types::*;
use crate::InvestRiskResult;

/// Hard ceiling on iterations; larger requests are rejected, not truncated.
pub const MAX_ITERATIONS: u32 = 1_000_000;

const HISTOGRAM_BINS: usize = 20;

/// At most this many distinct failure messages are copied into warnings.
const MAX_REPORTED_FAILURES: usize = 3;

/// Configuration for a Monte Carlo run over the caller's evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Assumptions to vary; everything else stays at base.
    pub distributions: BTreeMap<String, DistributionSpec>,
    /// Number of draws (1 ..= 1,000,000).
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Metrics strictly below this count as a loss.
    #[serde(default)]
    pub loss_threshold: f64,
    /// Seed for reproducibility; drawn from entropy (and reported) if absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub percentile_method: PercentileMethod,
    /// Keep every successful metric in the output, in draw order.
    #[serde(default)]
    pub retain_samples: bool,
}

fn default_iterations() -> u32 {
    10_000
}

impl MonteCarloConfig {
    pub fn new(distributions: BTreeMap<String, DistributionSpec>, iterations: u32, seed: u64) -> Self {
        MonteCarloConfig {
            distributions,
            iterations,
            loss_threshold: 0.0,
            seed: Some(seed),
            percentile_method: PercentileMethod::default(),
            retain_samples: false,
        }
    }

    pub fn validate(&self, base: &BaseScenario) -> InvestRiskResult<()> {
        self.samplers(base).map(|_| ())
    }

    fn samplers(&self, base: &BaseScenario) -> InvestRiskResult<Vec<(String, Sampler)>> {
        if self.iterations == 0 || self.iterations > MAX_ITERATIONS {
            return Err(InvestRiskError::invalid(
                "monte_carlo.iterations",
                format!("Must be between 1 and {MAX_ITERATIONS}"),
            ));
        }
        if !self.loss_threshold.is_finite() {
            return Err(InvestRiskError::invalid(
                "monte_carlo.loss_threshold",
                "Must be finite",
            ));
        }
        if self.distributions.is_empty() {
            return Err(InvestRiskError::invalid(
                "monte_carlo.distributions",
                "At least one distribution is required",
            ));
        }
        self.distributions
            .iter()
            .map(|(name, spec)| {
                let field = format!("distribution:{name}");
                base.require(name, &field)?;
                Ok((name.clone(), spec.sampler(&field)?))
            })
            .collect()
    }
}

/// Summary of one simulated input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McInputSummary {
    pub name: String,
    pub distribution: DistributionSpec,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Pearson correlation of this input with the metric over successful
    /// draws; `None` when either has zero variance.
    pub correlation_with_metric: Option<f64>,
}

/// Output of a Monte Carlo simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub metric_name: String,
    pub iterations: u32,
    pub successful_iterations: u32,
    pub failed_iterations: u32,
    /// Seed actually used; rerunning with it reproduces this output.
    pub seed: u64,
    pub percentiles: McPercentiles,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub loss_threshold: f64,
    pub probability_of_loss: f64,
    /// 5th percentile: the level the metric stays above 95% of the time.
    pub value_at_risk_95: f64,
    /// Mean of draws at or below the 5th percentile.
    pub expected_shortfall_95: f64,
    /// `std_dev / |mean|`; `None` when the mean is ~0.
    pub coefficient_of_variation: Option<f64>,
    pub skewness: f64,
    pub kurtosis: f64,
    pub histogram: Vec<HistogramBin>,
    pub input_summaries: Vec<McInputSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f64>>,
}

/// Run a Monte Carlo simulation of the evaluator's metric.
///
/// All draws are generated up front on a single `StdRng`, iteration by
/// iteration and variable by variable in name order, before any evaluation.
/// Evaluation may then run in parallel without changing the output. Draws
/// the evaluator rejects are excluded from the statistics and counted.
pub fn run_monte_carlo<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &MonteCarloConfig,
) -> InvestRiskResult<ComputationOutput<MonteCarloOutput>>
where
    E: Evaluator + ?Sized,
{
    simulate(base, evaluator, config, true)
}

pub(crate) fn simulate<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &MonteCarloConfig,
    parallel: bool,
) -> InvestRiskResult<ComputationOutput<MonteCarloOutput>>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let samplers = config.samplers(base)?;
    let seed = match config.seed {
        Some(s) => s,
        None => {
            let s = rand::random::<u64>();
            warnings.push(format!("No seed supplied; using generated seed {s}"));
            s
        }
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let n = config.iterations as usize;
    tracing::debug!(iterations = n, variables = samplers.len(), seed, "running Monte Carlo");

    let draws: Vec<Vec<f64>> = (0..n)
        .map(|_| samplers.iter().map(|(_, s)| s.sample(&mut rng)).collect())
        .collect();

    let names: Vec<&str> = samplers.iter().map(|(name, _)| name.as_str()).collect();
    let base_scenario = base.scenario();
    let evaluate = |row: &Vec<f64>| -> Result<f64, EvalError> {
        let mut scenario = base_scenario.clone();
        for (name, value) in names.iter().zip(row) {
            scenario.set(name, *value);
        }
        evaluate_checked(evaluator, &scenario)
    };
    let results = if parallel {
        ordered_map(&draws, evaluate)
    } else {
        sequential_map(&draws, evaluate)
    };

    let mut metrics: Vec<f64> = Vec::with_capacity(n);
    let mut ok_rows: Vec<usize> = Vec::with_capacity(n);
    let mut failure_messages: Vec<String> = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(m) => {
                metrics.push(m);
                ok_rows.push(i);
            }
            Err(e) => {
                if failure_messages.len() < MAX_REPORTED_FAILURES {
                    failure_messages.push(format!("draw {i}: {e}"));
                }
            }
        }
    }

    let failed = n - metrics.len();
    if metrics.is_empty() {
        return Err(InvestRiskError::InsufficientData(format!(
            "All {n} Monte Carlo draws failed ({})",
            failure_messages.join("; ")
        )));
    }
    if failed > 0 {
        tracing::warn!(failed, iterations = n, "Monte Carlo draws failed");
        warnings.push(format!(
            "{failed} of {n} draws failed and were excluded: {}",
            failure_messages.join("; ")
        ));
    }

    let moments: Welford = metrics.iter().copied().collect();
    let mean = moments.mean();
    let std_dev = moments.sample_variance().sqrt();

    let mut sorted = metrics.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let valid_n = sorted.len() as f64;

    let percentiles = McPercentiles::from_sorted(&sorted, config.percentile_method);
    let value_at_risk_95 = percentiles.p5;
    let tail: Welford = sorted
        .iter()
        .copied()
        .take_while(|&v| v <= value_at_risk_95)
        .collect();
    let expected_shortfall_95 = if tail.count() > 0 { tail.mean() } else { sorted[0] };

    let losses = sorted.iter().filter(|&&v| v < config.loss_threshold).count();
    let probability_of_loss = losses as f64 / valid_n;

    let coefficient_of_variation = if mean.abs() < crate::ZERO_EPSILON {
        warnings.push("Mean metric is ~0; coefficient of variation is undefined".into());
        None
    } else {
        Some(std_dev / mean.abs())
    };

    let (skewness, kurtosis) = shape_moments(&sorted, mean, moments.population_variance().sqrt());

    let input_summaries = samplers
        .iter()
        .enumerate()
        .map(|(j, (name, _))| {
            let column: Vec<f64> = draws.iter().map(|row| row[j]).collect();
            let stats: Welford = column.iter().copied().collect();
            let ok_column: Vec<f64> = ok_rows.iter().map(|&i| column[i]).collect();
            McInputSummary {
                name: name.clone(),
                distribution: config.distributions[name].clone(),
                mean: stats.mean(),
                std_dev: stats.sample_variance().sqrt(),
                min: column.iter().copied().fold(f64::INFINITY, f64::min),
                max: column.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                correlation_with_metric: pearson(&ok_column, &metrics),
            }
        })
        .collect();

    let output = MonteCarloOutput {
        metric_name: evaluator.metric_name().to_string(),
        iterations: config.iterations,
        successful_iterations: metrics.len() as u32,
        failed_iterations: failed as u32,
        seed,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        histogram: build_histogram(&sorted, HISTOGRAM_BINS),
        percentiles,
        mean,
        std_dev,
        loss_threshold: config.loss_threshold,
        probability_of_loss,
        value_at_risk_95,
        expected_shortfall_95,
        coefficient_of_variation,
        skewness,
        kurtosis,
        input_summaries,
        samples: config.retain_samples.then_some(metrics),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo Simulation",
        &serde_json::json!({
            "iterations": config.iterations,
            "seed": seed,
            "variables": names,
            "loss_threshold": config.loss_threshold,
            "percentile_method": config.percentile_method,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scenario;

    const SEED: u64 = 42;

    fn base() -> BaseScenario {
        BaseScenario::from_pairs([("rent", 2000.0), ("vacancy", 0.05)]).unwrap()
    }

    fn annual_rent(s: &Scenario) -> Result<f64, EvalError> {
        Ok(s.value("rent")? * (1.0 - s.value("vacancy")?) * 12.0)
    }

    fn rental_config(iterations: u32) -> MonteCarloConfig {
        let mut distributions = BTreeMap::new();
        distributions.insert(
            "rent".to_string(),
            DistributionSpec::Normal { mean: 2000.0, std_dev: 100.0 },
        );
        distributions.insert(
            "vacancy".to_string(),
            DistributionSpec::Uniform { min: 0.03, max: 0.08 },
        );
        MonteCarloConfig::new(distributions, iterations, SEED)
    }

    #[test]
    fn test_seeded_reproducibility() {
        let mut config = rental_config(10_000);
        config.retain_samples = true;
        let r1 = run_monte_carlo(&base(), &annual_rent, &config).unwrap().result;
        let r2 = run_monte_carlo(&base(), &annual_rent, &config).unwrap().result;
        assert_eq!(r1.samples, r2.samples);
        assert_eq!(r1.percentiles, r2.percentiles);
        assert_eq!(r1.mean, r2.mean);
        assert_eq!(r1.std_dev, r2.std_dev);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut config = rental_config(5_000);
        config.retain_samples = true;
        let par = simulate(&base(), &annual_rent, &config, true).unwrap().result;
        let seq = simulate(&base(), &annual_rent, &config, false).unwrap().result;
        assert_eq!(par.samples, seq.samples);
        assert_eq!(par.mean.to_bits(), seq.mean.to_bits());
        assert_eq!(par.percentiles, seq.percentiles);
    }

    #[test]
    fn test_percentile_ordering_and_ranges() {
        let out = run_monte_carlo(&base(), &annual_rent, &rental_config(10_000)).unwrap().result;
        let p = &out.percentiles;
        assert!(out.min <= p.p5);
        assert!(p.p5 <= p.p10 && p.p10 <= p.p25 && p.p25 <= p.p50);
        assert!(p.p50 <= p.p75 && p.p75 <= p.p90 && p.p90 <= p.p95);
        assert!(p.p95 <= out.max);
        assert_eq!(out.value_at_risk_95, p.p5);
        assert!(out.expected_shortfall_95 <= p.p5);
        assert!((0.0..=1.0).contains(&out.probability_of_loss));
        assert_eq!(out.probability_of_loss, 0.0);
    }

    #[test]
    fn test_rental_mean_near_analytical() {
        // E[rent] * (1 - E[vacancy]) * 12 with independent draws
        let expected = 2000.0 * (1.0 - 0.055) * 12.0;
        let out = run_monte_carlo(&base(), &annual_rent, &rental_config(20_000)).unwrap().result;
        assert!((out.mean - expected).abs() < 50.0, "mean={}", out.mean);
        assert!(out.coefficient_of_variation.unwrap() > 0.0);
    }

    #[test]
    fn test_input_summaries_and_correlation() {
        let out = run_monte_carlo(&base(), &annual_rent, &rental_config(10_000)).unwrap().result;
        assert_eq!(out.input_summaries.len(), 2);
        let rent = &out.input_summaries[0];
        let vacancy = &out.input_summaries[1];
        assert_eq!(rent.name, "rent");
        assert!(rent.correlation_with_metric.unwrap() > 0.5);
        assert!(vacancy.correlation_with_metric.unwrap() < 0.0);
        assert!(vacancy.min >= 0.03 && vacancy.max <= 0.08);
    }

    #[test]
    fn test_loss_threshold() {
        let mut config = rental_config(2_000);
        config.loss_threshold = f64::MAX;
        let out = run_monte_carlo(&base(), &annual_rent, &config).unwrap().result;
        assert_eq!(out.probability_of_loss, 1.0);
    }

    #[test]
    fn test_failed_draws_excluded_and_counted() {
        let guarded = |s: &Scenario| -> Result<f64, EvalError> {
            let vacancy = s.value("vacancy")?;
            if vacancy > 0.07 {
                return Err(EvalError::Failed("vacancy above covenant".into()));
            }
            annual_rent(s)
        };
        let out = run_monte_carlo(&base(), &guarded, &rental_config(5_000)).unwrap();
        let r = &out.result;
        assert!(r.failed_iterations > 0);
        assert_eq!(r.failed_iterations + r.successful_iterations, 5_000);
        assert!(out.warnings.iter().any(|w| w.contains("draws failed")));
    }

    #[test]
    fn test_all_draws_failed_is_error() {
        let broken = |_: &Scenario| -> Result<f64, EvalError> { Ok(f64::NAN) };
        assert!(run_monte_carlo(&base(), &broken, &rental_config(100)).is_err());
    }

    #[test]
    fn test_single_iteration_is_defined() {
        let out = run_monte_carlo(&base(), &annual_rent, &rental_config(1)).unwrap().result;
        assert_eq!(out.std_dev, 0.0);
        assert_eq!(out.percentiles.p5, out.percentiles.p95);
        assert!(out.mean.is_finite());
    }

    #[test]
    fn test_iteration_bounds_rejected() {
        let zero = rental_config(0);
        assert!(zero.validate(&base()).unwrap_err().is_configuration_error());
        let huge = rental_config(MAX_ITERATIONS + 1);
        assert!(huge.validate(&base()).is_err());
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut config = rental_config(100);
        config
            .distributions
            .insert("vacnacy".into(), DistributionSpec::Uniform { min: 0.0, max: 0.1 });
        assert!(run_monte_carlo(&base(), &annual_rent, &config).is_err());
    }

    #[test]
    fn test_zero_mean_cv_undefined() {
        let base = BaseScenario::from_pairs([("x", 0.0)]).unwrap();
        let identity = |s: &Scenario| -> Result<f64, EvalError> { s.value("x") };
        let mut distributions = BTreeMap::new();
        distributions.insert("x".to_string(), DistributionSpec::Uniform { min: 0.0, max: 0.0 });
        let config = MonteCarloConfig::new(distributions, 10, SEED);
        let out = run_monte_carlo(&base, &identity, &config).unwrap();
        assert_eq!(out.result.coefficient_of_variation, None);
        assert!(out.warnings.iter().any(|w| w.contains("undefined")));
    }

    #[test]
    fn test_missing_seed_is_reported() {
        let mut config = rental_config(50);
        config.seed = None;
        config.retain_samples = true;
        let first = run_monte_carlo(&base(), &annual_rent, &config).unwrap();
        let mut rerun = config.clone();
        rerun.seed = Some(first.result.seed);
        let second = run_monte_carlo(&base(), &annual_rent, &rerun).unwrap();
        assert_eq!(first.result.samples, second.result.samples);
    }
}
