use serde_json::{json, Value};

use invest_risk_core::real_estate::RealEstateModel;

/// List the built-in models and the assumptions each one reads.
pub fn run_models() -> Result<Value, Box<dyn std::error::Error>> {
    let models: Vec<Value> = RealEstateModel::ALL
        .iter()
        .map(|m| {
            json!({
                "model": m.name(),
                "description": m.description(),
                "required_assumptions": m.required_assumptions(),
            })
        })
        .collect();
    Ok(Value::Array(models))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_every_model() {
        let value = run_models().unwrap();
        let models = value.as_array().unwrap();
        assert_eq!(models.len(), RealEstateModel::ALL.len());
        assert_eq!(models[0]["model"], "annual_effective_rent");
    }
}
