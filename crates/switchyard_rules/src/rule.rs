//! The rule interface.

use crate::context::ExecutionContext;
use switchyard_core::CoreError;
use switchyard_policy::{AccessManifest, AccessViolation};

/// Error raised from within a rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Rule logic failed
    #[error("{message}")]
    Failed {
        /// Failure description
        message: String,
    },
    /// A required value was absent from a store
    #[error("missing data for {key}")]
    MissingData {
        /// Data key
        key: String,
    },
    /// Store access violated the rule's manifest
    #[error(transparent)]
    Violation(#[from] AccessViolation),
    /// A nested workflow failed
    #[error("sub-workflow failed: {reason}")]
    Subflow {
        /// Failure description
        reason: String,
    },
    /// Encoding, decoding, or internal failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RuleError {
    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// A named unit of decision logic with a boolean outcome.
///
/// Implementations must be stateless across calls; all per-call data lives
/// in the [`ExecutionContext`].
pub trait Rule: Send + Sync {
    /// Name the rule registers under
    fn name(&self) -> &str;

    /// Declared data intent. Called once per step execution.
    fn manifest(&self) -> AccessManifest {
        AccessManifest::new()
    }

    /// Run the rule
    ///
    /// # Errors
    ///
    /// Any error aborts the traversal the rule is part of.
    fn execute(&self, ctx: &mut ExecutionContext) -> Result<bool, RuleError>;
}

type RuleFn = dyn Fn(&mut ExecutionContext) -> Result<bool, RuleError> + Send + Sync;

/// Rule built from a closure
pub struct FnRule {
    name: String,
    manifest: AccessManifest,
    logic: Box<RuleFn>,
}

impl FnRule {
    /// Wrap a closure
    pub fn new<F>(name: impl Into<String>, logic: F) -> Self
    where
        F: Fn(&mut ExecutionContext) -> Result<bool, RuleError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            manifest: AccessManifest::new(),
            logic: Box::new(logic),
        }
    }

    /// Rule that always returns `outcome`
    pub fn constant(name: impl Into<String>, outcome: bool) -> Self {
        Self::new(name, move |_| Ok(outcome))
    }

    /// Attach a manifest
    #[must_use]
    pub fn with_manifest(mut self, manifest: AccessManifest) -> Self {
        self.manifest = manifest;
        self
    }
}

impl Rule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn manifest(&self) -> AccessManifest {
        self.manifest.clone()
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<bool, RuleError> {
        (self.logic)(ctx)
    }
}

impl std::fmt::Debug for FnRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}
