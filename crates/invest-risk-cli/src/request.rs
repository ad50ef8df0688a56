use serde::de::DeserializeOwned;
use serde::Deserialize;

use invest_risk_core::real_estate::RealEstateModel;
use invest_risk_core::BaseScenario;

use crate::input;

/// `{model, assumptions, config}` as read from a file or stdin.
///
/// `config` is optional so commands can build it from flags instead.
#[derive(Debug, Deserialize)]
#[serde(bound = "C: DeserializeOwned")]
pub struct ModelRequest<C> {
    pub model: RealEstateModel,
    pub assumptions: BaseScenario,
    #[serde(default, alias = "analyses")]
    pub config: Option<C>,
}

impl<C: DeserializeOwned> ModelRequest<C> {
    /// Load from `--input`, falling back to piped stdin.
    pub fn load(path: Option<&str>, command: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let request: Self = if let Some(path) = path {
            input::file::read_request(path)?
        } else if let Some(data) = input::stdin::read_stdin()? {
            serde_json::from_value(data)?
        } else {
            return Err(format!("--input <file.json|file.yaml> or stdin required for {command}").into());
        };
        request.check_model()?;
        tracing::debug!(
            model = request.model.name(),
            assumptions = request.assumptions.len(),
            "request loaded"
        );
        Ok(request)
    }

    /// Every assumption the model reads must be in the base scenario.
    pub fn check_model(&self) -> Result<(), Box<dyn std::error::Error>> {
        let missing = self.model.missing_assumptions(&self.assumptions);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "Model '{}' needs assumptions not in the base scenario: {}",
                self.model.name(),
                missing.join(", ")
            )
            .into())
        }
    }

    /// The config section, or an error naming the command.
    pub fn take_config(&mut self, command: &str) -> Result<C, Box<dyn std::error::Error>> {
        self.config
            .take()
            .ok_or_else(|| format!("Request for {command} has no 'config' section").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invest_risk_core::analysis::AnalysisConfig;
    use invest_risk_core::scenarios::ScenarioConfig;

    #[test]
    fn test_parse_request() {
        let json = r#"{
            "model": "annual_effective_rent",
            "assumptions": [
                {"name": "monthly_rent", "base_value": 2000.0, "unit": "USD"},
                {"name": "vacancy_rate", "base_value": 0.05}
            ],
            "config": {"scenarios": [{"name": "Boom", "overrides": {"vacancy_rate": 0.02}}]}
        }"#;
        let mut req: ModelRequest<ScenarioConfig> = serde_json::from_str(json).unwrap();
        assert!(req.check_model().is_ok());
        assert_eq!(req.take_config("scenarios").unwrap().scenarios.len(), 1);
        assert!(req.take_config("scenarios").is_err());
    }

    #[test]
    fn test_analyses_alias() {
        let json = r#"{
            "model": "annual_effective_rent",
            "assumptions": [{"name": "monthly_rent", "base_value": 2000.0}, {"name": "vacancy_rate", "base_value": 0.05}],
            "analyses": {"breakeven": {"targets": {"vacancy_rate": 20000.0}}}
        }"#;
        let req: ModelRequest<AnalysisConfig> = serde_json::from_str(json).unwrap();
        assert!(req.config.unwrap().breakeven.is_some());
    }

    #[test]
    fn test_missing_model_assumption() {
        let json = r#"{
            "model": "direct_cap_value",
            "assumptions": [{"name": "gross_potential_rent", "base_value": 1000000.0}]
        }"#;
        let req: ModelRequest<ScenarioConfig> = serde_json::from_str(json).unwrap();
        let err = req.check_model().unwrap_err().to_string();
        assert!(err.contains("cap_rate"));
    }

    #[test]
    fn test_duplicate_assumptions_rejected() {
        let json = r#"{
            "model": "annual_effective_rent",
            "assumptions": [{"name": "monthly_rent", "base_value": 1.0}, {"name": "monthly_rent", "base_value": 2.0}]
        }"#;
        assert!(serde_json::from_str::<ModelRequest<ScenarioConfig>>(json).is_err());
    }
}
