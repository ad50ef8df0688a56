use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::InvestRiskError;
use crate::model::scenario::Scenario;
use crate::InvestRiskResult;

/// A named numeric input to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    pub name: String,
    pub base_value: f64,
    /// Display only; the engine never interprets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Assumption {
    pub fn new(name: impl Into<String>, base_value: f64) -> Self {
        Assumption {
            name: name.into(),
            base_value,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// The validated base case: unique, finite, non-empty set of assumptions.
///
/// Deserialises from a plain list of assumptions and runs the same
/// validation as [`BaseScenario::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Assumption>", into = "Vec<Assumption>")]
pub struct BaseScenario {
    assumptions: Vec<Assumption>,
}

impl BaseScenario {
    pub fn new(assumptions: Vec<Assumption>) -> InvestRiskResult<Self> {
        if assumptions.is_empty() {
            return Err(InvestRiskError::invalid(
                "assumptions",
                "At least one assumption is required",
            ));
        }

        let mut seen = HashSet::with_capacity(assumptions.len());
        for a in &assumptions {
            if a.name.trim().is_empty() {
                return Err(InvestRiskError::invalid(
                    "assumptions",
                    "Assumption names must not be empty",
                ));
            }
            if !seen.insert(a.name.as_str()) {
                return Err(InvestRiskError::invalid(
                    format!("assumption:{}", a.name),
                    "Duplicate assumption name",
                ));
            }
            if !a.base_value.is_finite() {
                return Err(InvestRiskError::invalid(
                    format!("assumption:{}", a.name),
                    "Base value must be finite",
                ));
            }
        }

        Ok(BaseScenario { assumptions })
    }

    /// Build from `(name, value)` pairs without units.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> InvestRiskResult<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, value)| Assumption::new(name, value))
                .collect(),
        )
    }

    pub fn assumptions(&self) -> &[Assumption] {
        &self.assumptions
    }

    pub fn len(&self) -> usize {
        self.assumptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assumptions.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.base_value(name).is_some()
    }

    pub fn base_value(&self, name: &str) -> Option<f64> {
        self.assumptions
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.base_value)
    }

    /// Base value of `name`, or a configuration error attributed to `field`.
    pub fn require(&self, name: &str, field: &str) -> InvestRiskResult<f64> {
        self.base_value(name).ok_or_else(|| {
            InvestRiskError::invalid(field, format!("Unknown assumption '{name}'"))
        })
    }

    /// The base case as an evaluator input.
    pub fn scenario(&self) -> Scenario {
        Scenario::from_values(
            self.assumptions
                .iter()
                .map(|a| (a.name.clone(), a.base_value))
                .collect(),
        )
    }

    /// Base case with a single assumption replaced.
    pub fn with_override(&self, name: &str, value: f64) -> InvestRiskResult<Scenario> {
        let mut scenario = self.scenario();
        self.apply(&mut scenario, name, value)?;
        Ok(scenario)
    }

    /// Base case with every override applied; overrides win on collision.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> InvestRiskResult<Scenario> {
        let mut scenario = self.scenario();
        for (name, value) in overrides {
            self.apply(&mut scenario, name, *value)?;
        }
        Ok(scenario)
    }

    fn apply(&self, scenario: &mut Scenario, name: &str, value: f64) -> InvestRiskResult<()> {
        if !self.contains(name) {
            return Err(InvestRiskError::invalid(
                format!("override:{name}"),
                "Unknown assumption",
            ));
        }
        if !value.is_finite() {
            return Err(InvestRiskError::invalid(
                format!("override:{name}"),
                "Override value must be finite",
            ));
        }
        scenario.set(name, value);
        Ok(())
    }
}

impl TryFrom<Vec<Assumption>> for BaseScenario {
    type Error = InvestRiskError;

    fn try_from(assumptions: Vec<Assumption>) -> Result<Self, Self::Error> {
        BaseScenario::new(assumptions)
    }
}

impl From<BaseScenario> for Vec<Assumption> {
    fn from(base: BaseScenario) -> Self {
        base.assumptions
    }
}
