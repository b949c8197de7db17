//! Data contract validator.
//!
//! Checks a single store access against the manifest of the rule that is
//! currently running. Callers pass in whether the key is present so the
//! validator stays independent of the store representation.

use crate::config::{ContractConfig, EnforcementLevel};
use crate::manifest::{AccessManifest, ManifestSet};
use switchyard_core::CoreError;

/// A declared-intent mismatch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessViolation {
    /// Read of a key the rule is only meant to create
    #[error("attempting to read data for {key} when marked for creation only")]
    ReadOfCreated {
        /// Data key
        key: String,
    },
    /// Required response key absent on read
    #[error("existing data for {key} unavailable for reading when marked as {declared}")]
    MissingForRead {
        /// Data key
        key: String,
        /// Set the key was declared in
        declared: &'static str,
    },
    /// Required response key absent on overwrite
    #[error("existing data for {key} unavailable in response data for updating")]
    MissingForUpdate {
        /// Data key
        key: String,
    },
    /// Key marked for creation already has a value
    #[error("create data for {key} already present in response data when marked for creation only")]
    AlreadyPresent {
        /// Data key
        key: String,
    },
    /// Response key not declared for this kind of access
    #[error("rule has not recorded the intent of this data for {key}")]
    Undeclared {
        /// Data key
        key: String,
    },
    /// Request key not declared as expected input
    #[error("rule has not declared request data {key} as expected input")]
    UndeclaredInput {
        /// Data key
        key: String,
    },
    /// Declared request key absent
    #[error("missing mapped request data for {key}")]
    MissingInput {
        /// Data key
        key: String,
    },
    /// Request store write after traversal started
    #[error("request data is frozen once traversal starts, cannot write {key}")]
    RequestFrozen {
        /// Data key
        key: String,
    },
}

impl AccessViolation {
    /// Key the violation concerns
    pub fn key(&self) -> &str {
        match self {
            Self::ReadOfCreated { key }
            | Self::MissingForRead { key, .. }
            | Self::MissingForUpdate { key }
            | Self::AlreadyPresent { key }
            | Self::Undeclared { key }
            | Self::UndeclaredInput { key }
            | Self::MissingInput { key }
            | Self::RequestFrozen { key } => key,
        }
    }
}

impl From<AccessViolation> for CoreError {
    fn from(err: AccessViolation) -> Self {
        CoreError::Validation {
            field: err.key().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Outcome of a check that did not abort
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Access matches the declaration, or checks are off
    Allowed,
    /// Access violates the declaration but the level only reports it
    Reported(AccessViolation),
}

impl Verdict {
    /// Whether the access was clean
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Validates store accesses against a rule's manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractValidator {
    config: ContractConfig,
}

impl ContractValidator {
    /// Create a validator for the given configuration
    pub fn new(config: ContractConfig) -> Self {
        Self { config }
    }

    /// Effective enforcement level
    pub fn level(&self) -> EnforcementLevel {
        self.config.level()
    }

    /// Whether the pre-step manifest check is enabled
    pub fn pre_step_enabled(&self) -> bool {
        self.config.pre_step_check && self.level() != EnforcementLevel::Off
    }

    /// Check a required read of a response key.
    ///
    /// # Errors
    ///
    /// Returns the violation when the level is `Enforce`.
    pub fn check_read(
        &self,
        manifest: &AccessManifest,
        key: &str,
        present: bool,
    ) -> Result<Verdict, AccessViolation> {
        if self.level() == EnforcementLevel::Off {
            return Ok(Verdict::Allowed);
        }

        let optional = manifest.contains(ManifestSet::OptionalOutput, key);
        let declared = if manifest.contains(ManifestSet::ExpectedOutput, key) {
            Some("expected")
        } else if manifest.contains(ManifestSet::ModifiedOutput, key) {
            Some("modify")
        } else if optional {
            Some("optional")
        } else {
            None
        };

        match declared {
            None if manifest.contains(ManifestSet::CreatedOutput, key) => {
                self.resolve(AccessViolation::ReadOfCreated { key: key.to_string() })
            }
            None => self.resolve(AccessViolation::Undeclared { key: key.to_string() }),
            Some(declared) if !optional && !present => self.resolve(AccessViolation::MissingForRead {
                key: key.to_string(),
                declared,
            }),
            Some(_) => Ok(Verdict::Allowed),
        }
    }

    /// Check a read that tolerates absence.
    ///
    /// The key must still be declared in one of the readable sets.
    ///
    /// # Errors
    ///
    /// Returns the violation when the level is `Enforce`.
    pub fn check_optional_read(
        &self,
        manifest: &AccessManifest,
        key: &str,
    ) -> Result<Verdict, AccessViolation> {
        if self.level() == EnforcementLevel::Off {
            return Ok(Verdict::Allowed);
        }

        let readable = [
            ManifestSet::ExpectedOutput,
            ManifestSet::ModifiedOutput,
            ManifestSet::OptionalOutput,
        ]
        .iter()
        .any(|set| manifest.contains(*set, key));

        if readable {
            Ok(Verdict::Allowed)
        } else if manifest.contains(ManifestSet::CreatedOutput, key) {
            self.resolve(AccessViolation::ReadOfCreated { key: key.to_string() })
        } else {
            self.resolve(AccessViolation::Undeclared { key: key.to_string() })
        }
    }

    /// Check a write of a response key.
    ///
    /// A create that is allowed to proceed promotes the key to modified
    /// output, so later writes in the same step are overwrites.
    ///
    /// # Errors
    ///
    /// Returns the violation when the level is `Enforce`.
    pub fn check_write(
        &self,
        manifest: &mut AccessManifest,
        key: &str,
        present: bool,
    ) -> Result<Verdict, AccessViolation> {
        if self.level() == EnforcementLevel::Off {
            return Ok(Verdict::Allowed);
        }

        if manifest.contains(ManifestSet::CreatedOutput, key) {
            let verdict = if present {
                self.resolve(AccessViolation::AlreadyPresent { key: key.to_string() })?
            } else {
                Verdict::Allowed
            };
            manifest.promote(key);
            tracing::trace!(key, "created output promoted to modified");
            return Ok(verdict);
        }

        if manifest.contains(ManifestSet::ModifiedOutput, key) {
            if !present && !manifest.contains(ManifestSet::OptionalOutput, key) {
                return self.resolve(AccessViolation::MissingForUpdate { key: key.to_string() });
            }
            return Ok(Verdict::Allowed);
        }

        self.resolve(AccessViolation::Undeclared { key: key.to_string() })
    }

    /// Check a read of a request key
    ///
    /// # Errors
    ///
    /// Returns the violation when the level is `Enforce`.
    pub fn check_request_read(
        &self,
        manifest: &AccessManifest,
        key: &str,
    ) -> Result<Verdict, AccessViolation> {
        if self.level() == EnforcementLevel::Off
            || manifest.contains(ManifestSet::ExpectedInput, key)
        {
            return Ok(Verdict::Allowed);
        }
        self.resolve(AccessViolation::UndeclaredInput { key: key.to_string() })
    }

    /// Check the whole manifest against the stores before a rule runs.
    ///
    /// Expected input must be in the request store, expected and modified
    /// output must be in the response store, and created output must not.
    /// Returns every reported violation.
    ///
    /// # Errors
    ///
    /// Returns the first violation when the level is `Enforce`.
    pub fn check_manifest(
        &self,
        manifest: &AccessManifest,
        in_request: impl Fn(&str) -> bool,
        in_response: impl Fn(&str) -> bool,
    ) -> Result<Vec<AccessViolation>, AccessViolation> {
        if self.level() == EnforcementLevel::Off {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let inputs = manifest
            .set(ManifestSet::ExpectedInput)
            .iter()
            .filter(|key| !in_request(key))
            .map(|key| AccessViolation::MissingInput { key: key.clone() });
        let expected = manifest
            .set(ManifestSet::ExpectedOutput)
            .iter()
            .filter(|key| !in_response(key))
            .map(|key| AccessViolation::MissingForRead {
                key: key.clone(),
                declared: "expected",
            });
        let modified = manifest
            .set(ManifestSet::ModifiedOutput)
            .iter()
            .filter(|key| !manifest.contains(ManifestSet::OptionalOutput, key))
            .filter(|key| !in_response(key))
            .map(|key| AccessViolation::MissingForUpdate { key: key.clone() });
        let created = manifest
            .set(ManifestSet::CreatedOutput)
            .iter()
            .filter(|key| in_response(key))
            .map(|key| AccessViolation::AlreadyPresent { key: key.clone() });

        for violation in inputs.chain(expected).chain(modified).chain(created) {
            if let Verdict::Reported(violation) = self.resolve(violation)? {
                found.push(violation);
            }
        }
        Ok(found)
    }

    fn resolve(&self, violation: AccessViolation) -> Result<Verdict, AccessViolation> {
        match self.level() {
            EnforcementLevel::Off => Ok(Verdict::Allowed),
            EnforcementLevel::Report => {
                tracing::error!(key = violation.key(), "{}", violation);
                Ok(Verdict::Reported(violation))
            }
            EnforcementLevel::Enforce => {
                tracing::debug!(key = violation.key(), "contract violation: {}", violation);
                Err(violation)
            }
        }
    }
}
