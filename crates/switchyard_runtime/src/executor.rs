//! Single-node executor.

use crate::engine::ExecutionError;
use crate::mode::RunMode;
use crate::transcript::TranscriptEntry;
use switchyard_log::{ErrorCode, EventCategory, Severity};
use switchyard_plan::{RuleGraph, RuleNode};
use switchyard_rules::{ExecutionContext, RuleError};

/// Runs one node of a graph in the configured mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executor {
    mode: RunMode,
}

impl Executor {
    /// Create an executor for `mode`
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    /// Mode in effect
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Execute `node` and return its outcome.
    ///
    /// In test mode the rule is not invoked; a transcript entry is pushed
    /// onto the context and the outcome is always true.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::HandlerFailed` if the rule or its pre-step
    /// manifest check fails, or if an enforced contract violation occurred
    /// while the rule ran, even one the rule discarded. An ERROR event is
    /// recorded first.
    pub fn execute(
        &self,
        graph: &RuleGraph,
        node: &RuleNode,
        ctx: &mut ExecutionContext,
    ) -> Result<bool, ExecutionError> {
        let manifest = node.rule().manifest();
        match self.mode {
            RunMode::Normal => {
                ctx.set_current(node.name(), manifest);
                tracing::debug!(rule = %node.name(), "executing rule");

                let outcome = ctx
                    .check_manifest()
                    .and_then(|()| node.rule().execute(ctx))
                    .and_then(|outcome| match ctx.take_violation() {
                        Some(violation) => Err(RuleError::Violation(violation)),
                        None => Ok(outcome),
                    })
                    .map_err(|e| Self::failed(node, ctx, e))?;

                tracing::debug!(
                    rule = %node.name(),
                    result = if outcome { "pass" } else { "fail" },
                    "executed rule"
                );
                Ok(outcome)
            }
            RunMode::Test => {
                let entry = TranscriptEntry::new(
                    node.name(),
                    graph.name_of(node.on_true()),
                    graph.name_of(node.on_false()),
                    &manifest,
                );
                ctx.set_current(node.name(), manifest);
                let text = entry.render();
                tracing::debug!(rule = %node.name(), "{}", text);
                ctx.push_test_result(text);
                Ok(true)
            }
        }
    }

    fn failed(node: &RuleNode, ctx: &mut ExecutionContext, source: RuleError) -> ExecutionError {
        tracing::error!(rule = %node.rule_name(), step = %node.name(), error = %source, "unable to run rule");
        ctx.status_mut().add_event(
            Severity::Error,
            EventCategory::Exception,
            ErrorCode::Orch5003,
            format!("Unable to run {}, {}. {}", node.rule_name(), node.name(), source),
        );
        ExecutionError::HandlerFailed {
            node: node.name().to_string(),
            source,
        }
    }
}
