//! Graph traversal.

use crate::executor::Executor;
use crate::mode::RunMode;
use switchyard_core::Timestamp;
use switchyard_plan::RuleGraph;
use switchyard_rules::{ExecutionContext, RuleError};

/// Maximum node executions in one traversal
pub const MAX_STEPS: usize = 500;

/// Fatal traversal error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The step bound was reached
    #[error("limit of {limit} reached while running rules")]
    LoopLimitExceeded {
        /// Steps executed
        limit: usize,
    },
    /// A rule raised an error
    #[error("unable to run rule {node}. {source}")]
    HandlerFailed {
        /// Step name
        node: String,
        /// Rule error
        source: RuleError,
    },
    /// An edge pointed outside the graph
    #[error("node index {index} not in graph")]
    MissingNode {
        /// Offending index
        index: usize,
    },
}

impl ExecutionError {
    /// Whether the failure was a data contract violation
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            Self::HandlerFailed {
                source: RuleError::Violation(_),
                ..
            }
        )
    }
}

/// Outcome of one traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Result of the last step executed before END
    pub outcome: bool,
    /// Dry-run transcript; empty in normal mode
    pub diagnostic: String,
    /// When the traversal started
    pub started_at: Timestamp,
    /// Node executions, sentinels included
    pub steps: usize,
}

/// Traverses rule graphs
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionEngine {
    executor: Executor,
}

impl ExecutionEngine {
    /// Create an engine for `mode`
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self {
            executor: Executor::new(mode),
        }
    }

    /// Mode in effect
    pub fn mode(&self) -> RunMode {
        self.executor.mode()
    }

    /// Traverse `graph` from START until END is reached.
    ///
    /// A nested run (`top_level == false`) skips START and does not run
    /// END, so the outer bookends stay the only ones executed.
    ///
    /// # Errors
    ///
    /// Returns error if a rule fails or more than [`MAX_STEPS`] nodes would
    /// be executed
    pub fn run(
        &self,
        graph: &RuleGraph,
        ctx: &mut ExecutionContext,
        top_level: bool,
    ) -> Result<ExecutionResult, ExecutionError> {
        let started_at = Timestamp::now();
        let transcript_from = ctx.test_results().len();
        let mut outcome = true;
        let mut steps = 0;

        let mut current = graph.start();
        if !top_level {
            current = node_at(graph, current)?.on_true();
        }

        tracing::debug!(rules = %graph.source(), mode = %self.mode(), top_level, "running rule graph");

        loop {
            let node = node_at(graph, current)?;

            if graph.is_end(current) {
                if top_level {
                    self.executor.execute(graph, node, ctx)?;
                    steps += 1;
                }
                break;
            }

            if steps >= MAX_STEPS {
                tracing::error!(limit = MAX_STEPS, rule = %node.name(), "rule limit reached");
                return Err(ExecutionError::LoopLimitExceeded { limit: MAX_STEPS });
            }

            outcome = self.executor.execute(graph, node, ctx)?;
            steps += 1;
            current = node.next(outcome);
        }

        let diagnostic = match self.mode() {
            RunMode::Normal => String::new(),
            RunMode::Test => ctx.test_results()[transcript_from..].join("\n"),
        };

        tracing::debug!(outcome, steps, "rule graph complete");
        Ok(ExecutionResult {
            outcome,
            diagnostic,
            started_at,
            steps,
        })
    }
}

fn node_at(graph: &RuleGraph, index: switchyard_plan::NodeIndex) -> Result<&switchyard_plan::RuleNode, ExecutionError> {
    graph
        .get(index)
        .ok_or(ExecutionError::MissingNode { index: index.get() })
}
