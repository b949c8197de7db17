//! Graph sentinels.

use crate::context::ExecutionContext;
use crate::rule::{Rule, RuleError};

/// Name of the entry sentinel
pub const START: &str = "START";

/// Name of the exit sentinel
pub const END: &str = "END";

/// Entry sentinel. Always true so traversal proceeds to the first step.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartRule;

impl Rule for StartRule {
    fn name(&self) -> &str {
        START
    }

    fn execute(&self, _ctx: &mut ExecutionContext) -> Result<bool, RuleError> {
        tracing::trace!("workflow start");
        Ok(true)
    }
}

/// Exit sentinel. Its result never decides a run outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct EndRule;

impl Rule for EndRule {
    fn name(&self) -> &str {
        END
    }

    fn execute(&self, _ctx: &mut ExecutionContext) -> Result<bool, RuleError> {
        tracing::trace!("workflow end");
        Ok(false)
    }
}
