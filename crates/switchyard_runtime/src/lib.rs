//! SWITCHYARD Runtime
//!
//! Interprets a [`switchyard_plan::RuleGraph`] against an execution
//! context. Steps run one at a time on the caller's thread; the next step
//! is chosen by the boolean outcome of the previous one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod executor;
pub mod mode;
pub mod transcript;

pub use engine::{ExecutionEngine, ExecutionError, ExecutionResult, MAX_STEPS};
pub use executor::Executor;
pub use mode::RunMode;
pub use transcript::TranscriptEntry;
