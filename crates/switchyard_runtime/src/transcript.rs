//! Dry-run transcript entries.

use serde::{Deserialize, Serialize};
use switchyard_policy::{AccessManifest, ManifestSet};

/// What a dry run learned about one visited node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Node name
    pub node: String,
    /// True target
    pub on_pass: String,
    /// False target
    pub on_fail: String,
    /// Keys that would be checked, per manifest set
    pub checks: Vec<(ManifestSet, Vec<String>)>,
}

impl TranscriptEntry {
    /// Build an entry from a node's edges and manifest
    pub fn new(
        node: impl Into<String>,
        on_pass: impl Into<String>,
        on_fail: impl Into<String>,
        manifest: &AccessManifest,
    ) -> Self {
        let checks = ManifestSet::ALL
            .iter()
            .map(|set| (*set, manifest.set(*set).iter().cloned().collect()))
            .collect();
        Self {
            node: node.into(),
            on_pass: on_pass.into(),
            on_fail: on_fail.into(),
            checks,
        }
    }

    /// Multi-line text form
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rule: {}", self.node)?;
        writeln!(f, "  On pass: {}", self.on_pass)?;
        write!(f, "  On fail: {}", self.on_fail)?;
        for (set, keys) in &self.checks {
            if keys.is_empty() {
                write!(f, "\n  {}: none", set.label())?;
            } else {
                write!(f, "\n  {}: {}", set.label(), keys.join(", "))?;
            }
        }
        Ok(())
    }
}
