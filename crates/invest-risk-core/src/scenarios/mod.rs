pub mod comparison;

pub use comparison::{
    run_scenarios, NamedScenario, ScenarioComparisonOutput, ScenarioConfig, ScenarioResult, TieBreak,
};
