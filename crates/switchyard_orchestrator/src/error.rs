//! Orchestration errors.

use switchyard_cache::CacheError;
use switchyard_core::CoreError;
use switchyard_plan::CompileError;
use switchyard_runtime::ExecutionError;

/// Fatal orchestration error. The facade converts it to a `false` result
/// and an ERROR event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestrationError {
    /// The rule set did not compile
    #[error("unable to create orchestration rule set from {rules}. {source}")]
    Compile {
        /// Rule set text
        rules: String,
        /// Compile error
        source: CompileError,
    },
    /// Traversal failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// Infrastructure failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl OrchestrationError {
    pub(crate) fn from_cache(rules: &str, err: CacheError) -> Self {
        match err {
            CacheError::Compile(source) => Self::Compile {
                rules: rules.to_string(),
                source,
            },
            other => Self::Core(other.into()),
        }
    }
}
