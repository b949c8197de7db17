//! Rule set selection.

/// A predefined workflow an application can ask for by name
pub trait RuleSetSelector: Send + Sync {
    /// Selector name. `CUSTOM` selects the request's custom rule text.
    fn name(&self) -> &str;

    /// Rule set text of the workflow
    fn rules(&self) -> &str;

    /// Whether this selector defers to custom rule text
    fn is_custom(&self) -> bool {
        self.name().eq_ignore_ascii_case("CUSTOM")
    }
}

/// Built-in selectors with no rule text of their own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DefaultRuleSet {
    /// No workflow; runs START and END only
    #[default]
    None,
    /// Use the request's custom rule text
    Custom,
    /// Unrecognized workflow
    Unknown,
}

impl RuleSetSelector for DefaultRuleSet {
    fn name(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Custom => "CUSTOM",
            Self::Unknown => "UNKNOWN",
        }
    }

    fn rules(&self) -> &str {
        ""
    }
}

/// Selector carrying its own rule set text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedRuleSet {
    name: String,
    rules: String,
}

impl NamedRuleSet {
    /// Create a named workflow
    pub fn new(name: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: rules.into(),
        }
    }
}

impl RuleSetSelector for NamedRuleSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn rules(&self) -> &str {
        &self.rules
    }
}
