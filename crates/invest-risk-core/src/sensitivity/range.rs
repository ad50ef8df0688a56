use serde::{Deserialize, Serialize};

use crate::error::InvestRiskError;
use crate::model::BaseScenario;
use crate::types::Fraction;
use crate::InvestRiskResult;

/// Upper bound on points per axis; keeps a typo in `step` from exploding
/// into millions of evaluator calls.
pub const MAX_RANGE_POINTS: usize = 10_000;

/// How the values of one sensitivity axis are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensitivityRange {
    /// Perturbations relative to base (0.10 = +10%). `0.0` maps to the base
    /// value exactly.
    Percentages { percentages: Vec<Fraction> },
    /// Absolute input values.
    Values { values: Vec<f64> },
    /// `min..=max` in `step` increments; `max` is appended when the step
    /// does not land on it.
    Sweep { min: f64, max: f64, step: f64 },
}

/// One variable and the range it is varied over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub range: SensitivityRange,
}

impl SensitivityVariable {
    pub fn percentages(name: impl Into<String>, percentages: Vec<Fraction>) -> Self {
        SensitivityVariable {
            name: name.into(),
            range: SensitivityRange::Percentages { percentages },
        }
    }

    pub fn values(name: impl Into<String>, values: Vec<f64>) -> Self {
        SensitivityVariable {
            name: name.into(),
            range: SensitivityRange::Values { values },
        }
    }

    pub fn sweep(name: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        SensitivityVariable {
            name: name.into(),
            range: SensitivityRange::Sweep { min, max, step },
        }
    }

    /// Check the name against the base case and materialise the axis.
    pub(crate) fn resolve(&self, base: &BaseScenario) -> InvestRiskResult<ResolvedAxis> {
        let field = format!("variable:{}", self.name);
        let base_value = base.require(&self.name, &field)?;
        let values = self.range.resolve(&field, base_value)?;
        Ok(ResolvedAxis {
            name: self.name.clone(),
            base_value,
            values,
        })
    }
}

/// A validated axis ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedAxis {
    pub name: String,
    pub base_value: f64,
    pub values: Vec<f64>,
}

impl SensitivityRange {
    /// Absolute values for this range around `base_value`.
    pub fn resolve(&self, field: &str, base_value: f64) -> InvestRiskResult<Vec<f64>> {
        let values = match self {
            SensitivityRange::Percentages { percentages } => {
                if percentages.iter().any(|p| !p.is_finite()) {
                    return Err(InvestRiskError::invalid(field, "Percentages must be finite"));
                }
                percentages
                    .iter()
                    .map(|&p| {
                        if p == 0.0 {
                            base_value
                        } else {
                            base_value * (1.0 + p)
                        }
                    })
                    .collect()
            }
            SensitivityRange::Values { values } => values.clone(),
            SensitivityRange::Sweep { min, max, step } => sweep_values(field, *min, *max, *step)?,
        };

        if values.is_empty() {
            return Err(InvestRiskError::invalid(field, "Range must contain at least one point"));
        }
        if values.len() > MAX_RANGE_POINTS {
            return Err(InvestRiskError::invalid(
                field,
                format!("Range has {} points (max {MAX_RANGE_POINTS})", values.len()),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(InvestRiskError::invalid(field, "Range values must be finite"));
        }
        Ok(values)
    }
}

fn sweep_values(field: &str, min: f64, max: f64, step: f64) -> InvestRiskResult<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(InvestRiskError::invalid(field, "Sweep bounds must be finite"));
    }
    if step <= 0.0 {
        return Err(InvestRiskError::invalid(field, "Step must be positive"));
    }
    if min > max {
        return Err(InvestRiskError::invalid(field, "Min must be <= max"));
    }

    // Index-based stepping so rounding error does not accumulate.
    let full_steps = ((max - min) / step + 1e-9).floor();
    if full_steps + 1.0 > MAX_RANGE_POINTS as f64 {
        return Err(InvestRiskError::invalid(
            field,
            format!("Sweep would produce more than {MAX_RANGE_POINTS} points"),
        ));
    }

    let mut values: Vec<f64> = (0..=full_steps as usize)
        .map(|i| min + i as f64 * step)
        .collect();
    if let Some(&last) = values.last() {
        if last < max - step * 1e-9 {
            values.push(max);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_zero_is_exact_base() {
        let range = SensitivityRange::Percentages {
            percentages: vec![-0.1, 0.0, 0.1],
        };
        let vals = range.resolve("t", 0.07).unwrap();
        assert_eq!(vals[1], 0.07);
        assert!((vals[0] - 0.063).abs() < 1e-15);
        assert!((vals[2] - 0.077).abs() < 1e-15);
    }

    #[test]
    fn test_sweep_values() {
        let vals = sweep_values("t", 1.0, 5.0, 1.0).unwrap();
        assert_eq!(vals, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let vals = sweep_values("t", 0.0, 1.0, 0.3).unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), 1.0);
    }

    #[test]
    fn test_sweep_fractional_bounds_do_not_drift() {
        let vals = sweep_values("t", 0.08, 0.12, 0.01).unwrap();
        assert_eq!(vals.len(), 5);
        assert!((vals[4] - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_step() {
        assert!(sweep_values("t", 0.0, 1.0, 0.0).is_err());
        assert!(sweep_values("t", 0.0, 1.0, -0.5).is_err());
        assert!(sweep_values("t", 2.0, 1.0, 0.5).is_err());
    }

    #[test]
    fn test_sweep_point_cap() {
        assert!(sweep_values("t", 0.0, 1.0, 1e-9).is_err());
    }

    #[test]
    fn test_empty_range_rejected() {
        let range = SensitivityRange::Values { values: vec![] };
        assert!(range.resolve("t", 1.0).is_err());
    }

    #[test]
    fn test_resolve_unknown_variable() {
        let base = BaseScenario::from_pairs([("rent", 2000.0)]).unwrap();
        let var = SensitivityVariable::values("rnet", vec![1.0]);
        assert!(var.resolve(&base).is_err());
    }

    #[test]
    fn test_range_serde_shape() {
        let var: SensitivityVariable = serde_json::from_str(
            r#"{"name":"rent","range":{"type":"percentages","percentages":[-0.1,0.0,0.1]}}"#,
        )
        .unwrap();
        assert_eq!(var, SensitivityVariable::percentages("rent", vec![-0.1, 0.0, 0.1]));
    }
}
