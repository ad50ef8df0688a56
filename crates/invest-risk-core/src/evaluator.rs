//! The contract between the engine and the caller's financial model.
//!
//! An evaluator maps a full [`Scenario`] to one outcome metric. It must be
//! pure: the engine assumes the same scenario always yields the same
//! metric, and may call it from several threads at once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{BaseScenario, Scenario};

/// Failure signalled by (or on behalf of) an evaluator for one scenario.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EvalError {
    #[error("missing assumption '{0}'")]
    MissingAssumption(String),

    #[error("metric is not finite ({0})")]
    NonFinite(String),

    #[error("division by zero in {0}")]
    DivisionByZero(String),

    #[error("numeric overflow in {0}")]
    Overflow(String),

    #[error("{0}")]
    Failed(String),
}

/// Scenario → scalar outcome metric.
pub trait Evaluator: Sync {
    fn evaluate(&self, scenario: &Scenario) -> Result<f64, EvalError>;

    /// Label for the metric in methodology strings and reports.
    fn metric_name(&self) -> &str {
        "metric"
    }
}

impl<F> Evaluator for F
where
    F: Fn(&Scenario) -> Result<f64, EvalError> + Sync,
{
    fn evaluate(&self, scenario: &Scenario) -> Result<f64, EvalError> {
        self(scenario)
    }
}

/// Call the evaluator and reject NaN/Inf results.
///
/// NaN is a legitimate "undefined" answer from a model, but the engine never
/// lets it flow into statistics or rankings.
pub fn evaluate_checked<E>(evaluator: &E, scenario: &Scenario) -> Result<f64, EvalError>
where
    E: Evaluator + ?Sized,
{
    let value = evaluator.evaluate(scenario)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite(value.to_string()))
    }
}

/// Metric of the unmodified base case. A failure is logged, pushed onto
/// `warnings` and yields `None`; the analysis carries on without it.
pub(crate) fn base_metric_or_warn<E>(
    evaluator: &E,
    base: &BaseScenario,
    warnings: &mut Vec<String>,
) -> Option<f64>
where
    E: Evaluator + ?Sized,
{
    match evaluate_checked(evaluator, &base.scenario()) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "base scenario failed to evaluate");
            warnings.push(format!("Base scenario failed to evaluate: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseScenario;

    #[test]
    fn test_closure_is_evaluator() {
        let base = BaseScenario::from_pairs([("x", 3.0)]).unwrap();
        let double = |s: &Scenario| -> Result<f64, EvalError> { Ok(s.value("x")? * 2.0) };
        assert_eq!(evaluate_checked(&double, &base.scenario()), Ok(6.0));
        assert_eq!(double.metric_name(), "metric");
    }

    #[test]
    fn test_nan_becomes_error() {
        let base = BaseScenario::from_pairs([("x", 0.0)]).unwrap();
        let ratio = |s: &Scenario| -> Result<f64, EvalError> { Ok(s.value("x")? / 0.0) };
        let err = evaluate_checked(&ratio, &base.scenario()).unwrap_err();
        assert!(matches!(err, EvalError::NonFinite(_)));
    }

    #[test]
    fn test_dyn_evaluator() {
        let base = BaseScenario::from_pairs([("x", 1.5)]).unwrap();
        let f = |s: &Scenario| -> Result<f64, EvalError> { s.value("x") };
        let dynamic: &dyn Evaluator = &f;
        assert_eq!(evaluate_checked(dynamic, &base.scenario()), Ok(1.5));
    }
}
