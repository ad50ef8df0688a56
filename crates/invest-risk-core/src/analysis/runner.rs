use std::time::Instant;

use crate::analysis::config::AnalysisConfig;
use crate::analysis::report::{AnalysisReport, SectionOutcome};
use crate::breakeven::run_breakeven;
use crate::evaluator::{evaluate_checked, Evaluator};
use crate::model::BaseScenario;
use crate::monte_carlo::run_monte_carlo;
use crate::scenarios::run_scenarios;
use crate::sensitivity::{run_heatmap, run_tornado};
use crate::types::*;
use crate::InvestRiskResult;

/// Run every selected analysis and collect the results in one report.
///
/// Configuration is checked for all sections before anything is evaluated,
/// so a bad config fails fast. After that, a section that fails is recorded
/// in the report and the others still run.
pub fn run_analysis<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &AnalysisConfig,
) -> InvestRiskResult<ComputationOutput<AnalysisReport>>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate(base)?;
    let sections = config.selected_sections();
    tracing::debug!(?sections, "running combined analysis");

    let (base_metric, base_metric_error) = match evaluate_checked(evaluator, &base.scenario()) {
        Ok(m) => (Some(m), None),
        Err(e) => {
            tracing::warn!(error = %e, "base scenario failed to evaluate");
            warnings.push(format!("Base scenario failed to evaluate: {e}"));
            (None, Some(e.to_string()))
        }
    };

    let mut report = AnalysisReport {
        metric_name: evaluator.metric_name().to_string(),
        base_metric,
        base_metric_error,
        tornado: None,
        heatmap: None,
        monte_carlo: None,
        scenarios: None,
        breakeven: None,
    };

    if let Some(c) = &config.tornado {
        report.tornado = Some(run_tornado(base, evaluator, c).into());
    }
    if let Some(c) = &config.heatmap {
        report.heatmap = Some(run_heatmap(base, evaluator, c).into());
    }
    if let Some(c) = &config.monte_carlo {
        report.monte_carlo = Some(run_monte_carlo(base, evaluator, c).into());
    }
    if let Some(c) = &config.scenarios {
        report.scenarios = Some(run_scenarios(base, evaluator, c).into());
    }
    if let Some(c) = &config.breakeven {
        report.breakeven = Some(run_breakeven(base, evaluator, c).into());
    }

    for (section, error) in report.failed_sections() {
        tracing::warn!(section, error, "analysis section failed");
        warnings.push(format!("Section '{section}' failed: {error}"));
    }

    tracing::debug!(
        completed = report.completed_sections(),
        selected = sections.len(),
        "combined analysis finished"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Combined Investment Risk Analysis",
        &serde_json::json!({
            "sections": sections,
            "assumptions": base.len(),
        }),
        warnings,
        elapsed,
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakeven::{BreakEvenConfig, Difficulty};
    use crate::evaluator::EvalError;
    use crate::model::Scenario;
    use crate::sensitivity::{SensitivityVariable, TornadoConfig};

    fn base() -> BaseScenario {
        BaseScenario::from_pairs([("rent", 2000.0), ("vacancy", 0.05)]).unwrap()
    }

    fn annual_rent(s: &Scenario) -> Result<f64, EvalError> {
        Ok(s.value("rent")? * (1.0 - s.value("vacancy")?) * 12.0)
    }

    #[test]
    fn test_unreachable_breakeven_does_not_block_tornado() {
        let config = AnalysisConfig {
            tornado: Some(TornadoConfig {
                variables: vec![SensitivityVariable::percentages("rent", vec![-0.1, 0.0, 0.1])],
            }),
            breakeven: Some(
                BreakEvenConfig::new([("vacancy", 100000.0)]).with_bounds("vacancy", 0.0, 0.99),
            ),
            ..Default::default()
        };
        let out = run_analysis(&base(), &annual_rent, &config).unwrap();
        let report = &out.result;
        assert_eq!(report.base_metric, Some(22800.0));
        assert_eq!(report.completed_sections(), 2);
        let be = report.breakeven.as_ref().unwrap().output().unwrap();
        assert_eq!(be.result.results[0].difficulty, Difficulty::Unreachable);
    }

    #[test]
    fn test_failed_section_is_captured() {
        // Every rent above base fails, so the tornado still has points but
        // a break-even needing higher rent cannot evaluate its upper bound.
        let capped = |s: &Scenario| -> Result<f64, EvalError> {
            if s.value("rent")? > 2000.0 {
                return Err(EvalError::Failed("rent cap".into()));
            }
            annual_rent(s)
        };
        let config = AnalysisConfig {
            tornado: Some(TornadoConfig {
                variables: vec![SensitivityVariable::percentages("rent", vec![-0.1, 0.0, 0.1])],
            }),
            breakeven: Some(BreakEvenConfig::new([("rent", 25000.0)])),
            ..Default::default()
        };
        let out = run_analysis(&base(), &capped, &config).unwrap();
        let report = &out.result;
        assert!(report.tornado.as_ref().unwrap().is_completed());
        let failed = report.failed_sections();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "breakeven");
        assert!(out.warnings.iter().any(|w| w.contains("breakeven")));
    }

    #[test]
    fn test_base_failure_is_not_fatal() {
        let broken = |_: &Scenario| -> Result<f64, EvalError> { Err(EvalError::Failed("no model".into())) };
        let config = AnalysisConfig {
            breakeven: Some(BreakEvenConfig::new([("rent", 25000.0)])),
            ..Default::default()
        };
        let out = run_analysis(&base(), &broken, &config).unwrap();
        assert_eq!(out.result.base_metric, None);
        assert_eq!(out.result.base_metric_error.as_deref(), Some("no model"));
        assert!(!out.result.breakeven.as_ref().unwrap().is_completed());
    }

    #[test]
    fn test_config_errors_abort_before_evaluation() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let counting = |s: &Scenario| -> Result<f64, EvalError> {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            annual_rent(s)
        };
        let config = AnalysisConfig {
            tornado: Some(TornadoConfig {
                variables: vec![SensitivityVariable::percentages("rent", vec![0.1])],
            }),
            breakeven: Some(BreakEvenConfig::new([("vacnacy", 1.0)])),
            ..Default::default()
        };
        let err = run_analysis(&base(), &counting, &config).unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
