pub mod error;
pub mod evaluator;
pub mod model;
pub mod parallel;
pub mod types;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "breakeven")]
pub mod breakeven;

#[cfg(feature = "analysis")]
pub mod analysis;

#[cfg(feature = "real_estate")]
pub mod real_estate;

pub use error::InvestRiskError;
pub use evaluator::{evaluate_checked, EvalError, Evaluator};
pub use model::{Assumption, BaseScenario, Scenario};
pub use types::*;

/// Magnitudes below this are treated as zero when dividing by a base.
pub const ZERO_EPSILON: f64 = 1e-12;

/// Standard result type for all invest-risk operations
pub type InvestRiskResult<T> = Result<T, InvestRiskError>;
