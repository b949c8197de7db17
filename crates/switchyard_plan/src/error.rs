//! Compile errors.

use switchyard_core::CoreError;

/// Rule set compilation error. No graph is produced when one is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A step could not be parsed
    #[error("malformed step '{step}': {reason}")]
    Malformed {
        /// Step text
        step: String,
        /// What is wrong with it
        reason: &'static str,
    },
    /// The same step is defined more than once
    #[error("cannot have the same rule defined more than once in a rule set: {name}")]
    DuplicateStep {
        /// Step name
        name: String,
    },
    /// A branch target names no defined step
    #[error("cannot locate {branch} target {target} for step {step}")]
    UnknownTarget {
        /// Step carrying the branch
        step: String,
        /// Branch side, "true" or "false"
        branch: &'static str,
        /// Missing target
        target: String,
    },
    /// No rule is registered for a step
    #[error("missing rule {rule} for step {step}")]
    UnknownRule {
        /// Step name as written
        step: String,
        /// Rule name looked up
        rule: String,
    },
}

impl From<CompileError> for CoreError {
    fn from(err: CompileError) -> Self {
        CoreError::Validation {
            field: "rules".to_string(),
            reason: err.to_string(),
        }
    }
}
