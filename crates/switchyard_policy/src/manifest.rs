//! Per-rule access manifests.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// The five declaration sets of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSet {
    /// Must exist in the request store
    ExpectedInput,
    /// Must exist in the response store, read-only
    ExpectedOutput,
    /// May exist in the response store
    OptionalOutput,
    /// Must exist in the response store, will be overwritten
    ModifiedOutput,
    /// Must not yet exist in the response store, will be inserted
    CreatedOutput,
}

impl ManifestSet {
    /// All sets in display order
    pub const ALL: [ManifestSet; 5] = [
        Self::ExpectedInput,
        Self::ExpectedOutput,
        Self::OptionalOutput,
        Self::ModifiedOutput,
        Self::CreatedOutput,
    ];

    /// Human-readable label used in dry-run transcripts
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ExpectedInput => "Expected input",
            Self::ExpectedOutput => "Expected output",
            Self::OptionalOutput => "Optional output",
            Self::ModifiedOutput => "Modified output",
            Self::CreatedOutput => "Created output",
        }
    }
}

/// Declared data intent of a rule.
///
/// Keys are compared exactly. Builder methods keep the sets consistent:
/// a key cannot be both expected and optional output, and a modified key
/// is also expected unless declared optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessManifest {
    expected_input: IndexSet<String>,
    expected_output: IndexSet<String>,
    optional_output: IndexSet<String>,
    modified_output: IndexSet<String>,
    created_output: IndexSet<String>,
}

impl AccessManifest {
    /// Create an empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a request key the rule reads
    #[must_use]
    pub fn expects_input(mut self, key: impl Into<String>) -> Self {
        self.expected_input.insert(key.into());
        self
    }

    /// Declare a response key that must be present when read
    #[must_use]
    pub fn expects_output(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.optional_output.shift_remove(&key);
        self.expected_output.insert(key);
        self
    }

    /// Declare a response key that may be absent
    #[must_use]
    pub fn optional_output(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.expected_output.shift_remove(&key);
        self.optional_output.insert(key);
        self
    }

    /// Declare a response key the rule overwrites
    #[must_use]
    pub fn modifies_output(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.expected_output.contains(&key) && !self.optional_output.contains(&key) {
            self.expected_output.insert(key.clone());
        }
        self.modified_output.insert(key);
        self
    }

    /// Declare a response key the rule inserts
    #[must_use]
    pub fn creates_output(mut self, key: impl Into<String>) -> Self {
        self.created_output.insert(key.into());
        self
    }

    /// Keys of one declaration set, in declaration order
    pub fn set(&self, which: ManifestSet) -> &IndexSet<String> {
        match which {
            ManifestSet::ExpectedInput => &self.expected_input,
            ManifestSet::ExpectedOutput => &self.expected_output,
            ManifestSet::OptionalOutput => &self.optional_output,
            ManifestSet::ModifiedOutput => &self.modified_output,
            ManifestSet::CreatedOutput => &self.created_output,
        }
    }

    /// Whether `key` is in the given set
    pub fn contains(&self, which: ManifestSet, key: &str) -> bool {
        self.set(which).contains(key)
    }

    /// Move `key` from created to modified output.
    ///
    /// Returns false if the key was not declared as created.
    pub fn promote(&mut self, key: &str) -> bool {
        match self.created_output.shift_take(key) {
            Some(key) => {
                self.modified_output.insert(key);
                true
            }
            None => false,
        }
    }

    /// Whether any response set mentions `key`
    pub fn declares_output(&self, key: &str) -> bool {
        ManifestSet::ALL[1..].iter().any(|set| self.contains(*set, key))
    }

    /// Whether nothing has been declared
    pub fn is_empty(&self) -> bool {
        ManifestSet::ALL.iter().all(|set| self.set(*set).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_and_optional_are_exclusive() {
        let manifest = AccessManifest::new().optional_output("a").expects_output("a");
        assert!(manifest.contains(ManifestSet::ExpectedOutput, "a"));
        assert!(!manifest.contains(ManifestSet::OptionalOutput, "a"));

        let manifest = AccessManifest::new().expects_output("a").optional_output("a");
        assert!(!manifest.contains(ManifestSet::ExpectedOutput, "a"));
        assert!(manifest.contains(ManifestSet::OptionalOutput, "a"));
    }

    #[test]
    fn test_modified_implies_expected() {
        let manifest = AccessManifest::new().modifies_output("total");
        assert!(manifest.contains(ManifestSet::ModifiedOutput, "total"));
        assert!(manifest.contains(ManifestSet::ExpectedOutput, "total"));
    }

    #[test]
    fn test_modified_optional_stays_optional() {
        let manifest = AccessManifest::new()
            .optional_output("total")
            .modifies_output("total");
        assert!(manifest.contains(ManifestSet::ModifiedOutput, "total"));
        assert!(manifest.contains(ManifestSet::OptionalOutput, "total"));
        assert!(!manifest.contains(ManifestSet::ExpectedOutput, "total"));
    }

    #[test]
    fn test_promote() {
        let mut manifest = AccessManifest::new().creates_output("quote");
        assert!(manifest.promote("quote"));
        assert!(!manifest.contains(ManifestSet::CreatedOutput, "quote"));
        assert!(manifest.contains(ManifestSet::ModifiedOutput, "quote"));
        assert!(!manifest.promote("quote"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let manifest = AccessManifest::new().expects_output("Quote");
        assert!(manifest.declares_output("Quote"));
        assert!(!manifest.declares_output("quote"));
    }

    #[test]
    fn test_is_empty() {
        assert!(AccessManifest::new().is_empty());
        assert!(!AccessManifest::new().expects_input("id").is_empty());
    }

    proptest::proptest! {
        #[test]
        fn test_expected_optional_never_overlap(ops in proptest::collection::vec((0u8..5, 0u8..3), 0..30)) {
            let mut manifest = AccessManifest::new();
            for (op, key) in ops {
                let key = format!("k{key}");
                manifest = match op {
                    0 => manifest.expects_output(key),
                    1 => manifest.optional_output(key),
                    2 => manifest.modifies_output(key),
                    3 => manifest.creates_output(key),
                    _ => manifest.expects_input(key),
                };
            }
            for key in manifest.set(ManifestSet::ExpectedOutput) {
                proptest::prop_assert!(!manifest.contains(ManifestSet::OptionalOutput, key));
            }
            for key in manifest.set(ManifestSet::ModifiedOutput) {
                proptest::prop_assert!(
                    manifest.contains(ManifestSet::ExpectedOutput, key)
                        || manifest.contains(ManifestSet::OptionalOutput, key)
                );
            }
        }
    }
}
