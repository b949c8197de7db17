//! Rule set text parsing.
//!
//! Grammar: a comma-separated list of steps, each either `Name` or
//! `Name?OnTrue:OnFalse` with either branch optional. A name may carry a
//! `<digits>.` alias prefix so one rule can appear as several steps.

use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use switchyard_rules::{END, START};

/// One parsed step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    /// Step name as written, alias included
    pub name: String,
    /// Explicit true target
    pub on_true: Option<String>,
    /// Explicit false target
    pub on_false: Option<String>,
}

impl Step {
    /// Unconditional step
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_true: None,
            on_false: None,
        }
    }

    /// Name of the registered rule this step runs
    pub fn rule_name(&self) -> &str {
        strip_alias(&self.name)
    }

    /// Whether this step defines `name`, ignoring case
    pub fn defines(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        match (&self.on_true, &self.on_false) {
            (None, None) => Ok(()),
            (Some(t), None) => write!(f, "?{}", t),
            (t, Some(e)) => write!(f, "?{}:{}", t.as_deref().unwrap_or(""), e),
        }
    }
}

/// Split rule set text into step tokens.
///
/// Whitespace is removed, empty entries are dropped, and START and END are
/// added when the text does not already begin and end with them.
pub fn normalize(text: &str) -> Vec<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut tokens: Vec<String> = compact
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if !tokens.first().is_some_and(|t| primary(t).eq_ignore_ascii_case(START)) {
        tokens.insert(0, START.to_string());
    }
    if !tokens.last().is_some_and(|t| primary(t).eq_ignore_ascii_case(END)) {
        tokens.push(END.to_string());
    }
    tokens
}

/// Parse rule set text into steps
///
/// # Errors
///
/// Returns `CompileError::Malformed` if a step cannot be parsed
pub fn parse(text: &str) -> Result<Vec<Step>, CompileError> {
    normalize(text).iter().map(|t| parse_step(t)).collect()
}

/// Remove a leading `<digits>.` alias prefix
pub fn strip_alias(name: &str) -> &str {
    match name.split_once('.') {
        Some((prefix, rest))
            if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest
        }
        _ => name,
    }
}

fn primary(token: &str) -> &str {
    token.split_once('?').map_or(token, |(name, _)| name)
}

fn parse_step(token: &str) -> Result<Step, CompileError> {
    let malformed = |reason| CompileError::Malformed {
        step: token.to_string(),
        reason,
    };

    let (name, branches) = match token.split_once('?') {
        Some((name, branches)) => (name, Some(branches)),
        None if token.contains(':') => return Err(malformed("':' without '?'")),
        None => (token, None),
    };
    if name.is_empty() {
        return Err(malformed("empty step name"));
    }

    let mut step = Step::new(name);
    if let Some(branches) = branches {
        if branches.contains('?') {
            return Err(malformed("more than one '?'"));
        }
        let (on_true, on_false) = branches.split_once(':').unwrap_or((branches, ""));
        if on_false.contains(':') {
            return Err(malformed("more than one ':'"));
        }
        step.on_true = Some(on_true.to_string()).filter(|t| !t.is_empty());
        step.on_false = Some(on_false.to_string()).filter(|t| !t.is_empty());
    }
    Ok(step)
}
