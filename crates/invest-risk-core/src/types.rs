use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fractions of a base value (0.10 = +10%). Never whole percentages.
pub type Fraction = f64;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
    pub generated_at: DateTime<Utc>,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
            generated_at: Utc::now(),
        },
    }
}

/// A variable an analysis could not produce any result for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableFailure {
    pub name: String,
    pub reason: String,
}

/// Relative change `(value - base) / base`, undefined when the base is ~0.
pub fn relative_change(value: f64, base: f64) -> Option<Fraction> {
    if base.abs() < crate::ZERO_EPSILON {
        None
    } else {
        Some((value - base) / base)
    }
}
