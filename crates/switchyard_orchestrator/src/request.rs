//! Orchestration requests.

use crate::selector::{DefaultRuleSet, RuleSetSelector};
use std::sync::Arc;
use switchyard_rules::ExecutionContext;

/// One orchestration call: which workflow to run and the data to run it on
pub struct OrchestrationRequest {
    selector: Arc<dyn RuleSetSelector>,
    custom_rules: Option<String>,
    context: ExecutionContext,
}

impl OrchestrationRequest {
    /// Request for a predefined workflow
    pub fn new(selector: Arc<dyn RuleSetSelector>) -> Self {
        Self {
            selector,
            custom_rules: None,
            context: ExecutionContext::new(),
        }
    }

    /// Request for ad-hoc rule set text
    pub fn custom(rules: impl Into<String>) -> Self {
        Self::new(Arc::new(DefaultRuleSet::Custom)).with_custom_rules(rules)
    }

    /// Override the selector's rule text
    #[must_use]
    pub fn with_custom_rules(mut self, rules: impl Into<String>) -> Self {
        self.custom_rules = Some(rules.into());
        self
    }

    /// Use a prepared context
    #[must_use]
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Rule set text to run.
    ///
    /// Non-empty custom text wins; a `CUSTOM` selector without custom text
    /// yields an empty rule set.
    pub fn rules(&self) -> &str {
        match self.custom_rules.as_deref() {
            Some(custom) if !custom.is_empty() => custom,
            _ if self.selector.is_custom() => "",
            _ => self.selector.rules(),
        }
    }

    /// Selector name
    pub fn selector_name(&self) -> &str {
        self.selector.name()
    }

    /// Execution context
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Mutable execution context
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Take the context back, with its stores and status
    pub fn into_context(self) -> ExecutionContext {
        self.context
    }
}

impl std::fmt::Debug for OrchestrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationRequest")
            .field("selector", &self.selector.name())
            .field("custom_rules", &self.custom_rules)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::NamedRuleSet;

    #[test]
    fn test_selector_rules() {
        let request = OrchestrationRequest::new(Arc::new(NamedRuleSet::new("QUOTE", "A,B")));
        assert_eq!(request.rules(), "A,B");
        assert_eq!(request.selector_name(), "QUOTE");
    }

    #[test]
    fn test_custom_overrides_selector() {
        let request = OrchestrationRequest::new(Arc::new(NamedRuleSet::new("QUOTE", "A,B")))
            .with_custom_rules("C");
        assert_eq!(request.rules(), "C");

        let request = OrchestrationRequest::new(Arc::new(NamedRuleSet::new("QUOTE", "A,B")))
            .with_custom_rules("");
        assert_eq!(request.rules(), "A,B");
    }

    #[test]
    fn test_custom_selector() {
        assert_eq!(OrchestrationRequest::custom("A").rules(), "A");
        assert_eq!(OrchestrationRequest::new(Arc::new(DefaultRuleSet::Custom)).rules(), "");
        assert_eq!(OrchestrationRequest::new(Arc::new(DefaultRuleSet::None)).rules(), "");
    }

    proptest::proptest! {
        #[test]
        fn test_non_empty_custom_always_wins(
            selector in "[A-Z]{1,8}",
            default in "[A-Z,]{0,16}",
            custom in "[A-Z,]{1,16}",
        ) {
            let request = OrchestrationRequest::new(Arc::new(NamedRuleSet::new(selector, default)))
                .with_custom_rules(custom.clone());
            proptest::prop_assert_eq!(request.rules(), custom.as_str());
        }
    }
}
