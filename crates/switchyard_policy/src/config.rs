//! Enforcement configuration.

use serde::{Deserialize, Serialize};

/// How strictly declared intent is checked at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    /// No checks
    Off,
    /// Violations are logged and recorded, traversal continues
    Report,
    /// Violations abort the call
    Enforce,
}

/// Contract validation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Log violations
    pub report: bool,
    /// Fail on violations
    pub enforce: bool,
    /// Check the whole manifest against the stores before each step
    pub pre_step_check: bool,
}

impl ContractConfig {
    /// Configuration that performs no checks
    #[must_use]
    pub const fn off() -> Self {
        Self {
            report: false,
            enforce: false,
            pre_step_check: false,
        }
    }

    /// Configuration that fails on the first violation
    #[must_use]
    pub const fn enforcing() -> Self {
        Self {
            report: true,
            enforce: true,
            pre_step_check: false,
        }
    }

    /// Enable the pre-step manifest check
    #[must_use]
    pub const fn with_pre_step_check(mut self, enabled: bool) -> Self {
        self.pre_step_check = enabled;
        self
    }

    /// Effective enforcement level. `enforce` takes precedence over `report`.
    #[must_use]
    pub const fn level(&self) -> EnforcementLevel {
        if self.enforce {
            EnforcementLevel::Enforce
        } else if self.report {
            EnforcementLevel::Report
        } else {
            EnforcementLevel::Off
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            report: true,
            enforce: false,
            pre_step_check: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(ContractConfig::off().level(), EnforcementLevel::Off);
        assert_eq!(ContractConfig::default().level(), EnforcementLevel::Report);
        assert_eq!(ContractConfig::enforcing().level(), EnforcementLevel::Enforce);

        let both = ContractConfig {
            report: false,
            enforce: true,
            pre_step_check: false,
        };
        assert_eq!(both.level(), EnforcementLevel::Enforce);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ContractConfig = serde_json::from_str(r#"{"enforce": true}"#).unwrap();
        assert!(config.report);
        assert!(config.enforce);
        assert!(!config.pre_step_check);
    }
}
