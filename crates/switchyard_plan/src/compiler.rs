//! Compiler from rule set text to [`RuleGraph`].

use crate::dsl::{self, Step};
use crate::error::CompileError;
use crate::graph::{NodeIndex, RuleGraph, RuleNode};
use crate::validate::validate;
use indexmap::IndexMap;
use std::sync::Arc;
use switchyard_rules::{END, Rule, RuleRegistry, START};

/// Compiles rule set text against a registry snapshot
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<RuleRegistry>,
}

impl Compiler {
    /// Create a compiler over `registry`
    #[must_use]
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// Registry rules are resolved against
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Compile rule set text.
    ///
    /// Every step becomes a node. A step's true edge defaults to the next
    /// listed step and its false edge to END; `Name?:X` only overrides the
    /// false edge.
    ///
    /// # Errors
    ///
    /// Returns error if the text is malformed, defines a step twice,
    /// branches to an undefined step, or names an unregistered rule
    pub fn compile(&self, text: &str) -> Result<RuleGraph, CompileError> {
        tracing::info!(rules = %text, "creating rule graph");
        self.build(text).inspect_err(|e| {
            tracing::error!(rules = %text, error = %e, "rule set rejected");
        })
    }

    fn build(&self, text: &str) -> Result<RuleGraph, CompileError> {
        let steps = dsl::parse(text)?;
        validate(&steps)?;

        // Bind every step first so forward references resolve.
        let mut index = IndexMap::with_capacity(steps.len());
        let mut rules: Vec<Arc<dyn Rule>> = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let rule = self
                .registry
                .lookup(step.rule_name())
                .ok_or_else(|| CompileError::UnknownRule {
                    step: step.name.clone(),
                    rule: step.rule_name().to_string(),
                })?;
            index.insert(step.name.to_ascii_uppercase(), NodeIndex::new(i));
            rules.push(rule);
        }

        let resolve = |step: &Step, branch: &'static str, target: &str| {
            index
                .get(&target.to_ascii_uppercase())
                .copied()
                .ok_or_else(|| CompileError::UnknownTarget {
                    step: step.name.clone(),
                    branch,
                    target: target.to_string(),
                })
        };

        let first = steps.first().cloned().unwrap_or_else(|| Step::new(START));
        let start = resolve(&first, "true", START)?;
        let end = resolve(&first, "false", END)?;

        let mut nodes = Vec::with_capacity(steps.len());
        for (i, (step, rule)) in steps.iter().zip(rules).enumerate() {
            let next = if i + 1 < steps.len() {
                NodeIndex::new(i + 1)
            } else {
                end
            };
            let on_true = match &step.on_true {
                Some(target) => resolve(step, "true", target)?,
                None => next,
            };
            let on_false = match &step.on_false {
                Some(target) => resolve(step, "false", target)?,
                None => end,
            };
            tracing::debug!(
                step = %step.name,
                on_true = %steps[on_true.get()].name,
                on_false = %steps[on_false.get()].name,
                "node created"
            );
            nodes.push(RuleNode::new(
                step.name.clone(),
                step.rule_name().to_string(),
                rule,
                on_true,
                on_false,
            ));
        }

        let source = steps.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        Ok(RuleGraph::new(nodes, index, start, end, source))
    }
}
