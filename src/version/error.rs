use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid version: {input:?}")]
    InvalidVersion { input: String },

    #[error("Invalid constraint {input:?}: {reason}")]
    InvalidConstraint { input: String, reason: String },
}

impl ParseError {
    pub(crate) fn constraint(input: &str, reason: impl Into<String>) -> Self {
        ParseError::InvalidConstraint {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
