//! SWITCHYARD Data Contracts
//!
//! Every rule declares which data keys it reads, modifies and creates.
//! The validator holds each access made during traversal against that
//! declaration, at the configured enforcement level.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod contract;
pub mod manifest;

pub use config::{ContractConfig, EnforcementLevel};
pub use contract::{AccessViolation, ContractValidator, Verdict};
pub use manifest::{AccessManifest, ManifestSet};
