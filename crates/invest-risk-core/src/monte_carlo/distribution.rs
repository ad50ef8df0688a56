use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{LogNormal, Normal, Triangular, Uniform};

use crate::error::InvestRiskError;
use crate::InvestRiskResult;

/// Probability distribution specification for a Monte Carlo variable.
///
/// Draws are never clamped. If a model needs bounded inputs (occupancy in
/// [0, 1], say) the evaluator is the place to enforce that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DistributionSpec {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    Uniform { min: f64, max: f64 },
}

/// A validated distribution ready to draw from.
#[derive(Debug, Clone)]
pub(crate) enum Sampler {
    /// Zero-width specs (std_dev = 0, min = max).
    Constant(f64),
    Normal(Normal),
    LogNormal(LogNormal),
    Triangular(Triangular),
    Uniform(Uniform),
}

impl Sampler {
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Constant(v) => *v,
            Sampler::Normal(d) => rng.sample(d),
            Sampler::LogNormal(d) => rng.sample(d),
            Sampler::Triangular(d) => rng.sample(d),
            Sampler::Uniform(d) => rng.sample(d),
        }
    }
}

impl DistributionSpec {
    /// Check parameter invariants without building anything.
    pub fn validate(&self, field: &str) -> InvestRiskResult<()> {
        self.sampler(field).map(|_| ())
    }

    /// Draw one value. Prefer building a sampler once when drawing many.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> InvestRiskResult<f64> {
        Ok(self.sampler("distribution")?.sample(rng))
    }

    /// Analytical mean of the distribution.
    pub fn mean(&self) -> f64 {
        match *self {
            DistributionSpec::Normal { mean, .. } => mean,
            DistributionSpec::LogNormal { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
            DistributionSpec::Triangular { min, mode, max } => (min + mode + max) / 3.0,
            DistributionSpec::Uniform { min, max } => (min + max) / 2.0,
        }
    }

    pub(crate) fn sampler(&self, field: &str) -> InvestRiskResult<Sampler> {
        let params: &[f64] = match self {
            DistributionSpec::Normal { mean, std_dev } => &[*mean, *std_dev],
            DistributionSpec::LogNormal { mu, sigma } => &[*mu, *sigma],
            DistributionSpec::Triangular { min, mode, max } => &[*min, *mode, *max],
            DistributionSpec::Uniform { min, max } => &[*min, *max],
        };
        if params.iter().any(|p| !p.is_finite()) {
            return Err(InvestRiskError::invalid(field, "Distribution parameters must be finite"));
        }

        match *self {
            DistributionSpec::Normal { mean, std_dev } => {
                if std_dev < 0.0 {
                    return Err(InvestRiskError::invalid(field, "Normal std_dev must be >= 0"));
                }
                if std_dev == 0.0 {
                    return Ok(Sampler::Constant(mean));
                }
                Normal::new(mean, std_dev)
                    .map(Sampler::Normal)
                    .map_err(|e| InvestRiskError::invalid(field, format!("Invalid Normal parameters: {e}")))
            }
            DistributionSpec::LogNormal { mu, sigma } => {
                if sigma < 0.0 {
                    return Err(InvestRiskError::invalid(field, "LogNormal sigma must be >= 0"));
                }
                if sigma == 0.0 {
                    return Ok(Sampler::Constant(mu.exp()));
                }
                LogNormal::new(mu, sigma)
                    .map(Sampler::LogNormal)
                    .map_err(|e| InvestRiskError::invalid(field, format!("Invalid LogNormal parameters: {e}")))
            }
            DistributionSpec::Triangular { min, mode, max } => {
                if !(min <= mode && mode <= max) {
                    return Err(InvestRiskError::invalid(
                        field,
                        "Triangular requires min <= mode <= max",
                    ));
                }
                if min == max {
                    return Ok(Sampler::Constant(min));
                }
                Triangular::new(min, max, mode)
                    .map(Sampler::Triangular)
                    .map_err(|e| InvestRiskError::invalid(field, format!("Invalid Triangular parameters: {e}")))
            }
            DistributionSpec::Uniform { min, max } => {
                if min > max {
                    return Err(InvestRiskError::invalid(field, "Uniform requires min <= max"));
                }
                if min == max {
                    return Ok(Sampler::Constant(min));
                }
                Uniform::new(min, max)
                    .map(Sampler::Uniform)
                    .map_err(|e| InvestRiskError::invalid(field, format!("Invalid Uniform parameters: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn draws(spec: &DistributionSpec, n: usize) -> Vec<f64> {
        let sampler = spec.sampler("test").unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        (0..n).map(|_| sampler.sample(&mut rng)).collect()
    }

    fn mean(xs: &[f64]) -> f64 {
        xs.iter().sum::<f64>() / xs.len() as f64
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let bad = [
            DistributionSpec::Normal { mean: 0.0, std_dev: -1.0 },
            DistributionSpec::Uniform { min: 2.0, max: 1.0 },
            DistributionSpec::Triangular { min: 0.0, mode: 2.0, max: 1.0 },
            DistributionSpec::Triangular { min: 1.0, mode: 0.5, max: 2.0 },
            DistributionSpec::LogNormal { mu: 0.0, sigma: -0.1 },
            DistributionSpec::Normal { mean: f64::NAN, std_dev: 1.0 },
        ];
        for spec in &bad {
            let err = spec.validate("x").unwrap_err();
            assert!(err.is_configuration_error(), "{spec:?} should be rejected");
        }
    }

    #[test]
    fn test_degenerate_specs_are_point_masses() {
        let specs = [
            DistributionSpec::Normal { mean: 3.0, std_dev: 0.0 },
            DistributionSpec::Uniform { min: 3.0, max: 3.0 },
            DistributionSpec::Triangular { min: 3.0, mode: 3.0, max: 3.0 },
        ];
        for spec in &specs {
            assert!(draws(spec, 10).iter().all(|&v| v == 3.0));
        }
    }

    #[test]
    fn test_uniform_bounds_and_mean() {
        let spec = DistributionSpec::Uniform { min: 0.03, max: 0.08 };
        let xs = draws(&spec, 10_000);
        assert!(xs.iter().all(|&v| (0.03..=0.08).contains(&v)));
        assert!((mean(&xs) - spec.mean()).abs() < 0.001);
    }

    #[test]
    fn test_triangular_mean() {
        let spec = DistributionSpec::Triangular { min: 0.0, mode: 0.05, max: 0.10 };
        let xs = draws(&spec, 10_000);
        assert!(xs.iter().all(|&v| (0.0..=0.10).contains(&v)));
        assert!((mean(&xs) - spec.mean()).abs() < 0.005);
    }

    #[test]
    fn test_normal_mean() {
        let spec = DistributionSpec::Normal { mean: 2000.0, std_dev: 100.0 };
        let xs = draws(&spec, 20_000);
        assert!((mean(&xs) - 2000.0).abs() < 5.0);
    }

    #[test]
    fn test_lognormal_positive() {
        let spec = DistributionSpec::LogNormal { mu: 0.0, sigma: 0.5 };
        let xs = draws(&spec, 10_000);
        assert!(xs.iter().all(|&v| v > 0.0));
        assert!((mean(&xs) - spec.mean()).abs() < 0.05);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let spec = DistributionSpec::Normal { mean: 0.0, std_dev: 1.0 };
        assert_eq!(draws(&spec, 100), draws(&spec, 100));
    }

    #[test]
    fn test_serde_tag() {
        let spec: DistributionSpec =
            serde_json::from_str(r#"{"type":"Triangular","min":1.0,"mode":2.0,"max":4.0}"#).unwrap();
        assert_eq!(spec, DistributionSpec::Triangular { min: 1.0, mode: 2.0, max: 4.0 });
    }
}
