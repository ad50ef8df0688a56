use serde::Serialize;
use std::collections::BTreeMap;

use crate::evaluator::EvalError;

/// A full assumption set handed to an evaluator.
///
/// Only constructed from a [`BaseScenario`](crate::model::BaseScenario), so
/// every name it carries is a known assumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Scenario {
    values: BTreeMap<String, f64>,
}

impl Scenario {
    pub(crate) fn from_values(values: BTreeMap<String, f64>) -> Self {
        Scenario { values }
    }

    pub(crate) fn set(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Lookup for evaluators: a missing name is an evaluator error.
    pub fn value(&self, name: &str) -> Result<f64, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::MissingAssumption(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::BaseScenario;

    #[test]
    fn test_value_missing_is_eval_error() {
        let s = BaseScenario::from_pairs([("rent", 1.0)]).unwrap().scenario();
        assert_eq!(s.value("rent"), Ok(1.0));
        assert!(s.value("vacancy").is_err());
    }

    #[test]
    fn test_iteration_is_name_ordered() {
        let s = BaseScenario::from_pairs([("z", 1.0), ("a", 2.0)])
            .unwrap()
            .scenario();
        let names: Vec<&str> = s.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "z"]);
    }

    #[test]
    fn test_set_never_adds_names() {
        let mut s = BaseScenario::from_pairs([("rent", 1.0)]).unwrap().scenario();
        s.set("rent", 2.0);
        s.set("vacancy", 0.5);
        assert_eq!(s.get("rent"), Some(2.0));
        assert_eq!(s.get("vacancy"), None);
        assert_eq!(serde_json::to_value(&s).unwrap(), serde_json::json!({"rent": 2.0}));
    }
}
