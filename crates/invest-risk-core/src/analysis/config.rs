use serde::{Deserialize, Serialize};

use crate::breakeven::BreakEvenConfig;
use crate::error::InvestRiskError;
use crate::model::BaseScenario;
use crate::monte_carlo::MonteCarloConfig;
use crate::scenarios::ScenarioConfig;
use crate::sensitivity::{HeatMapConfig, TornadoConfig};
use crate::InvestRiskResult;

/// Which analyses to run, and how. Absent sections are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tornado: Option<TornadoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<HeatMapConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<ScenarioConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakeven: Option<BreakEvenConfig>,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> InvestRiskResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Names of the selected sections, in run order.
    pub fn selected_sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        if self.tornado.is_some() {
            sections.push("tornado");
        }
        if self.heatmap.is_some() {
            sections.push("heatmap");
        }
        if self.monte_carlo.is_some() {
            sections.push("monte_carlo");
        }
        if self.scenarios.is_some() {
            sections.push("scenarios");
        }
        if self.breakeven.is_some() {
            sections.push("breakeven");
        }
        sections
    }

    /// Validate every selected section against the base scenario.
    pub fn validate(&self, base: &BaseScenario) -> InvestRiskResult<()> {
        if self.selected_sections().is_empty() {
            return Err(InvestRiskError::invalid(
                "analyses",
                "Select at least one analysis",
            ));
        }
        if let Some(c) = &self.tornado {
            c.validate(base)?;
        }
        if let Some(c) = &self.heatmap {
            c.validate(base)?;
        }
        if let Some(c) = &self.monte_carlo {
            c.validate(base)?;
        }
        if let Some(c) = &self.scenarios {
            c.validate(base)?;
        }
        if let Some(c) = &self.breakeven {
            c.validate(base)?;
        }
        Ok(())
    }
}
