use serde::{Deserialize, Serialize};

use crate::breakeven::BreakEvenOutput;
use crate::monte_carlo::MonteCarloOutput;
use crate::scenarios::ScenarioComparisonOutput;
use crate::sensitivity::{HeatMapOutput, TornadoOutput};
use crate::types::ComputationOutput;
use crate::InvestRiskResult;

/// Result of one section of a combined analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionOutcome<T> {
    Completed { output: ComputationOutput<T> },
    Failed { error: String },
}

impl<T> SectionOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, SectionOutcome::Completed { .. })
    }

    pub fn output(&self) -> Option<&ComputationOutput<T>> {
        match self {
            SectionOutcome::Completed { output } => Some(output),
            SectionOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SectionOutcome::Completed { .. } => None,
            SectionOutcome::Failed { error } => Some(error),
        }
    }
}

impl<T> From<InvestRiskResult<ComputationOutput<T>>> for SectionOutcome<T> {
    fn from(result: InvestRiskResult<ComputationOutput<T>>) -> Self {
        match result {
            Ok(output) => SectionOutcome::Completed { output },
            Err(e) => SectionOutcome::Failed { error: e.to_string() },
        }
    }
}

/// Combined report; unselected sections are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metric_name: String,
    pub base_metric: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_metric_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tornado: Option<SectionOutcome<TornadoOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<SectionOutcome<HeatMapOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<SectionOutcome<MonteCarloOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<SectionOutcome<ScenarioComparisonOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakeven: Option<SectionOutcome<BreakEvenOutput>>,
}

impl AnalysisReport {
    /// `(section, error)` for each selected section that failed.
    pub fn failed_sections(&self) -> Vec<(&'static str, &str)> {
        [
            ("tornado", self.tornado.as_ref().and_then(|s| s.error())),
            ("heatmap", self.heatmap.as_ref().and_then(|s| s.error())),
            ("monte_carlo", self.monte_carlo.as_ref().and_then(|s| s.error())),
            ("scenarios", self.scenarios.as_ref().and_then(|s| s.error())),
            ("breakeven", self.breakeven.as_ref().and_then(|s| s.error())),
        ]
        .into_iter()
        .filter_map(|(name, err)| err.map(|e| (name, e)))
        .collect()
    }

    pub fn completed_sections(&self) -> usize {
        [
            self.tornado.as_ref().map(|s| s.is_completed()),
            self.heatmap.as_ref().map(|s| s.is_completed()),
            self.monte_carlo.as_ref().map(|s| s.is_completed()),
            self.scenarios.as_ref().map(|s| s.is_completed()),
            self.breakeven.as_ref().map(|s| s.is_completed()),
        ]
        .into_iter()
        .filter(|c| *c == Some(true))
        .count()
    }
}
