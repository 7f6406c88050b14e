pub mod codec;
pub mod failsim;
pub mod fingerprint;
pub mod flagger;
pub mod rules;
pub mod store;
pub mod transform;
pub mod validate;

pub use failsim::FailureSimulator;
pub use flagger::FailureFlagger;
pub use store::{StoreStage, parse_entry};
pub use transform::{TransformStage, Transformer};
pub use validate::{ValidateStage, Validator};

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::ReasonCode;

/// The three stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validate,
    Transform,
    Store,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Transform => "transform",
            Self::Store => "store",
        }
    }

    /// Label under which an error raised by this stage reaches the flaggers.
    pub fn error_type(self) -> &'static str {
        match self {
            Self::Validate => "ValidateError",
            Self::Transform => "TransformError",
            Self::Store => "StoreError",
        }
    }

    /// Reason recorded when this stage rejects a tuple.
    pub fn rejection_reason(self) -> ReasonCode {
        match self {
            Self::Validate => ReasonCode::ValidationFailed,
            Self::Transform => ReasonCode::TransformationFailed,
            Self::Store => ReasonCode::StoreFailed,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infrastructure failure of a stage, as opposed to a business rejection.
#[derive(Debug, Error)]
#[error("{stage} stage: {message}: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
    #[source]
    pub source: common::Error,
}

impl StageError {
    pub fn new(stage: Stage, message: impl Into<String>, source: common::Error) -> Self {
        Self {
            stage,
            message: message.into(),
            source,
        }
    }

    pub fn error_type(&self) -> &'static str {
        self.stage.error_type()
    }

    pub fn is_transient(&self) -> bool {
        self.source.is_transient()
    }
}

/// Accept/reject decision of the validator or transformer, with the
/// rewritten tuple when accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub accepted: bool,
    pub tuple: String,
}

impl Classification {
    pub fn accepted(tuple: String) -> Self {
        Self {
            accepted: true,
            tuple,
        }
    }

    pub fn rejected(tuple: &str) -> Self {
        Self {
            accepted: false,
            tuple: tuple.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_carries_flagger_label() {
        let err = StageError::new(
            Stage::Store,
            "unable to put raw tuple",
            common::Error::Storage("timeout".into()),
        );
        assert_eq!(err.error_type(), "StoreError");
        assert!(err.is_transient());
        assert_eq!(
            err.to_string(),
            "store stage: unable to put raw tuple: Storage error: timeout"
        );
    }

    #[test]
    fn test_rejection_reasons_follow_stage_order() {
        assert_eq!(Stage::Validate.rejection_reason().code(), 1);
        assert_eq!(Stage::Transform.rejection_reason().code(), 2);
        assert_eq!(Stage::Store.rejection_reason().code(), 3);
    }
}
