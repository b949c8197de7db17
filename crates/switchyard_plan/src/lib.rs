//! SWITCHYARD Planner
//!
//! Compiles rule set text such as `VALIDATE?CHECK:END,CHECK,END` into a
//! [`RuleGraph`]: one node per defined step, each with a resolved rule and
//! resolved true and false edges. Graphs may contain cycles.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod validate;

pub use compiler::Compiler;
pub use dsl::{Step, normalize, parse, strip_alias};
pub use error::CompileError;
pub use graph::{NodeIndex, NodeSummary, RuleGraph, RuleNode};
pub use validate::validate;
