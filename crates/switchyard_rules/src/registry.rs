//! Rule registry.
//!
//! Maps a case-insensitive rule name to its implementation. The compiler
//! resolves every step against a registry snapshot.

use crate::builtin::{EndRule, StartRule};
use crate::rule::Rule;
use indexmap::IndexMap;
use std::sync::Arc;
use switchyard_core::CoreError;

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Rule already registered under this name
    AlreadyRegistered {
        /// Normalized rule name
        name: String,
    },
    /// Rule not found
    NotFound {
        /// Requested rule name
        name: String,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRegistered { name } => write!(f, "Rule already registered: {}", name),
            Self::NotFound { name } => write!(f, "Rule not found: {}", name),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<RegistryError> for CoreError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRegistered { name } => CoreError::AlreadyExists {
                kind: "rule".to_string(),
                id: name,
            },
            RegistryError::NotFound { name } => CoreError::NotFound {
                kind: "rule".to_string(),
                id: name,
            },
        }
    }
}

/// Registry of rules keyed by upper-cased name.
///
/// START and END are always present.
pub struct RuleRegistry {
    rules: IndexMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Create a registry holding only the START and END sentinels
    #[must_use]
    pub fn new() -> Self {
        let mut rules: IndexMap<String, Arc<dyn Rule>> = IndexMap::new();
        rules.insert(normalize(crate::builtin::START), Arc::new(StartRule));
        rules.insert(normalize(crate::builtin::END), Arc::new(EndRule));
        Self { rules }
    }

    /// Register a rule under its own name
    ///
    /// # Errors
    ///
    /// Returns error if a rule with the same name is already registered
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), RegistryError> {
        let name = rule.name().to_string();
        self.register_as(&name, rule)
    }

    /// Register a rule under an explicit name.
    ///
    /// One implementation may be registered under several names.
    ///
    /// # Errors
    ///
    /// Returns error if the name is taken
    pub fn register_as(&mut self, name: &str, rule: Arc<dyn Rule>) -> Result<(), RegistryError> {
        let key = normalize(name);
        if self.rules.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered { name: key });
        }
        tracing::debug!(rule = %key, "rule registered");
        self.rules.insert(key, rule);
        Ok(())
    }

    /// Register a rule, replacing any rule of the same name.
    ///
    /// Returns the replaced rule.
    pub fn register_or_replace(&mut self, rule: Arc<dyn Rule>) -> Option<Arc<dyn Rule>> {
        let key = normalize(rule.name());
        let previous = self.rules.insert(key.clone(), rule);
        if previous.is_some() {
            tracing::warn!(rule = %key, "rule replaced in registry");
        }
        previous
    }

    /// Get a rule by name
    ///
    /// # Errors
    ///
    /// Returns error if rule not found
    pub fn get(&self, name: &str) -> Result<Arc<dyn Rule>, RegistryError> {
        self.lookup(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    /// Get a rule by name, if registered
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Rule>> {
        self.rules.get(&normalize(name)).map(Arc::clone)
    }

    /// Check if a rule is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(&normalize(name))
    }

    /// Remove a rule. The sentinels cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns error if the rule is not registered or is a sentinel
    pub fn unregister(&mut self, name: &str) -> Result<Arc<dyn Rule>, RegistryError> {
        let key = normalize(name);
        if key == crate::builtin::START || key == crate::builtin::END {
            return Err(RegistryError::NotFound { name: key });
        }
        self.rules
            .shift_remove(&key)
            .ok_or(RegistryError::NotFound { name: key })
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }

    /// Number of registered rules, sentinels included
    #[must_use]
    pub fn count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}
