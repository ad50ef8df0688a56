use thiserror::Error;

use crate::evaluator::EvalError;

#[derive(Debug, Error)]
pub enum InvestRiskError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Evaluation failed for {context}: {source}")]
    Evaluation {
        context: String,
        #[source]
        source: EvalError,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl InvestRiskError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        InvestRiskError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any evaluation took place.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            InvestRiskError::InvalidInput { .. } | InvestRiskError::SerializationError(_)
        )
    }
}

impl From<serde_json::Error> for InvestRiskError {
    fn from(e: serde_json::Error) -> Self {
        InvestRiskError::SerializationError(e.to_string())
    }
}
