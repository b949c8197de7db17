//! Structural checks over parsed steps.
//!
//! Step names are compared case-insensitively and in full, alias
//! included: `1.RETRY` and `2.RETRY` are distinct steps running the same
//! rule. Only defining positions count towards duplicates.

use crate::dsl::Step;
use crate::error::CompileError;
use indexmap::IndexSet;

/// Run every structural check, in order
///
/// # Errors
///
/// Returns the first failing check's error
pub fn validate(steps: &[Step]) -> Result<(), CompileError> {
    check_duplicates(steps)?;
    check_targets(steps)
}

/// Reject a step name defined more than once
///
/// # Errors
///
/// Returns `CompileError::DuplicateStep` for the first repeated name
pub fn check_duplicates(steps: &[Step]) -> Result<(), CompileError> {
    let mut seen = IndexSet::with_capacity(steps.len());
    for step in steps {
        if !seen.insert(step.name.to_ascii_uppercase()) {
            tracing::error!(step = %step.name, "rule defined more than once");
            return Err(CompileError::DuplicateStep {
                name: step.name.clone(),
            });
        }
    }
    Ok(())
}

/// Reject branch targets that name no defined step
///
/// # Errors
///
/// Returns `CompileError::UnknownTarget` for the first unresolved target
pub fn check_targets(steps: &[Step]) -> Result<(), CompileError> {
    let defined: IndexSet<String> = steps.iter().map(|s| s.name.to_ascii_uppercase()).collect();

    for step in steps {
        let branches = [("true", &step.on_true), ("false", &step.on_false)];
        for (branch, target) in branches {
            let Some(target) = target else { continue };
            if !defined.contains(&target.to_ascii_uppercase()) {
                tracing::error!(step = %step.name, target = %target, "branch target not defined");
                return Err(CompileError::UnknownTarget {
                    step: step.name.clone(),
                    branch,
                    target: target.clone(),
                });
            }
        }
    }
    Ok(())
}
