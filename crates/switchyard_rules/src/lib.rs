//! SWITCHYARD Rules
//!
//! The rule interface, the name-to-rule registry the compiler resolves
//! against, and the execution context rules read from and write to.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtin;
pub mod context;
pub mod registry;
pub mod rule;
pub mod store;

pub use builtin::{END, EndRule, START, StartRule};
pub use context::{ExecutionContext, NodeFrame, SubflowRunner};
pub use registry::{RegistryError, RuleRegistry};
pub use rule::{FnRule, Rule, RuleError};
pub use store::DataStore;
