//! Orchestration configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use switchyard_core::{CoreError, CoreResult, Duration};
use switchyard_policy::ContractConfig;
use switchyard_runtime::RunMode;

/// Orchestration settings. Every field has a default, so partial JSON
/// documents are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Memoize compiled graphs
    pub cache_enabled: bool,
    /// Lifetime of a cached graph in milliseconds
    pub cache_ttl_ms: u64,
    /// Traversal mode
    pub mode: RunMode,
    /// Data contract enforcement
    pub contract: ContractConfig,
}

impl OrchestrationConfig {
    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if the document is malformed or
    /// fails validation
    pub fn from_json(text: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if the file cannot be read or
    /// parsed
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::InvalidConfig {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json(&text)
    }

    /// Check field combinations
    ///
    /// # Errors
    ///
    /// Returns error if caching is enabled with a zero lifetime
    pub fn validate(&self) -> CoreResult<()> {
        if self.cache_enabled && self.cache_ttl_ms == 0 {
            return Err(CoreError::InvalidConfig {
                reason: "cache_ttl_ms must be positive when caching is enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Cache lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Set the traversal mode
    #[must_use]
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set contract enforcement
    #[must_use]
    pub fn with_contract(mut self, contract: ContractConfig) -> Self {
        self.contract = contract;
        self
    }

    /// Enable or disable graph caching
    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_ms: 60_000,
            mode: RunMode::Normal,
            contract: ContractConfig::default(),
        }
    }
}
