//! SWITCHYARD Orchestrator
//!
//! Entry point for running a workflow: select the rule set text, obtain a
//! compiled graph from the cache, traverse it against the caller's context,
//! and record the call's diagnostics whatever the outcome.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod facade;
pub mod request;
pub mod selector;

pub use config::OrchestrationConfig;
pub use error::OrchestrationError;
pub use facade::{MAX_SUBFLOW_DEPTH, Orchestrator};
pub use request::OrchestrationRequest;
pub use selector::{DefaultRuleSet, NamedRuleSet, RuleSetSelector};
