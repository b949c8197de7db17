//! Per-call execution context.
//!
//! Holds the request store (frozen once traversal starts), the response
//! store, and the state of the node that is currently running. While a
//! traversal is in progress and a manifest is installed, every store access
//! goes through the contract validator.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchyard_core::{CoreError, RunId};
use switchyard_log::{ErrorCode, EventCategory, Severity, Status};
use switchyard_policy::{AccessManifest, AccessViolation, ContractConfig, ContractValidator, Verdict};

use crate::rule::RuleError;
use crate::store::DataStore;

/// Runs a nested workflow against an existing context
pub trait SubflowRunner: Send + Sync {
    /// Compile and run `rules` as a nested workflow sharing `ctx`'s stores
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Subflow` if the nested run fails or records an
    /// error event.
    fn run_subflow(&self, ctx: &mut ExecutionContext, rules: &str) -> Result<bool, RuleError>;
}

/// Node state saved around a nested run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFrame {
    /// Node name
    pub node: Option<String>,
    /// Active manifest
    pub manifest: Option<AccessManifest>,
    /// First violation enforced while this node ran
    pub violation: Option<AccessViolation>,
}

/// Mutable state for one orchestration call
pub struct ExecutionContext {
    run_id: RunId,
    request: DataStore,
    response: DataStore,
    frame: NodeFrame,
    traversing: bool,
    validator: ContractValidator,
    status: Status,
    test_results: Vec<String>,
    subflow: Option<Arc<dyn SubflowRunner>>,
    subflow_depth: usize,
    recorded: usize,
}

impl ExecutionContext {
    /// Create a context with the default contract configuration
    pub fn new() -> Self {
        Self::with_contract(ContractConfig::default())
    }

    /// Create a context with an explicit contract configuration
    pub fn with_contract(config: ContractConfig) -> Self {
        let run_id = RunId::new();
        let mut status = Status::new();
        status.set_run(run_id);
        Self {
            run_id,
            request: DataStore::new(),
            response: DataStore::new(),
            frame: NodeFrame::default(),
            traversing: false,
            validator: ContractValidator::new(config),
            status,
            test_results: Vec::new(),
            subflow: None,
            subflow_depth: 0,
            recorded: 0,
        }
    }

    /// Replace the contract configuration
    pub fn set_contract(&mut self, config: ContractConfig) {
        self.validator = ContractValidator::new(config);
    }

    /// Identifier of this call
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Contract validator in effect
    pub fn validator(&self) -> &ContractValidator {
        &self.validator
    }

    // Request store

    /// Add inbound data. Only allowed before traversal starts.
    ///
    /// # Errors
    ///
    /// Returns `AccessViolation::RequestFrozen` once traversal has started,
    /// or an encoding error if `value` cannot be serialized.
    pub fn put_request<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), RuleError> {
        if self.traversing {
            return Err(AccessViolation::RequestFrozen {
                key: key.to_string(),
            }
            .into());
        }
        let value = encode(key, value)?;
        self.request.insert(key, value);
        Ok(())
    }

    /// Read required inbound data
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MissingData` if absent, or a violation if the key
    /// is not declared as expected input under enforcement.
    pub fn request(&mut self, key: &str) -> Result<Value, RuleError> {
        self.request_optional(key)?
            .ok_or_else(|| RuleError::MissingData { key: key.to_string() })
    }

    /// Read inbound data that may be absent
    ///
    /// # Errors
    ///
    /// Returns a violation if the key is not declared as expected input
    /// under enforcement.
    pub fn request_optional(&mut self, key: &str) -> Result<Option<Value>, RuleError> {
        if let Some(manifest) = self.gating_manifest() {
            let checked = self.validator.check_request_read(manifest, key);
            self.settle(checked)?;
        }
        Ok(self.request.get(key).filter(|v| !v.is_null()).cloned())
    }

    /// Read required inbound data as `T`
    ///
    /// # Errors
    ///
    /// As [`Self::request`], plus a decoding error if the value does not
    /// match `T`.
    pub fn request_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, RuleError> {
        let value = self.request(key)?;
        decode(key, value)
    }

    // Response store

    /// Read required response data
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MissingData` if absent, or a violation under
    /// enforcement.
    pub fn get(&mut self, key: &str) -> Result<Value, RuleError> {
        if let Some(manifest) = self.gating_manifest() {
            let present = self.response.contains(key);
            let checked = self.validator.check_read(manifest, key, present);
            self.settle(checked)?;
        }
        self.response
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| RuleError::MissingData { key: key.to_string() })
    }

    /// Read response data that may be absent
    ///
    /// # Errors
    ///
    /// Returns a violation under enforcement if the key is not declared
    /// readable.
    pub fn get_optional(&mut self, key: &str) -> Result<Option<Value>, RuleError> {
        if let Some(manifest) = self.gating_manifest() {
            let checked = self.validator.check_optional_read(manifest, key);
            self.settle(checked)?;
        }
        Ok(self.response.get(key).filter(|v| !v.is_null()).cloned())
    }

    /// Read required response data as `T`
    ///
    /// # Errors
    ///
    /// As [`Self::get`], plus a decoding error.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, RuleError> {
        let value = self.get(key)?;
        decode(key, value)
    }

    /// Read optional response data as `T`
    ///
    /// # Errors
    ///
    /// As [`Self::get_optional`], plus a decoding error.
    pub fn get_optional_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, RuleError> {
        self.get_optional(key)?.map(|v| decode(key, v)).transpose()
    }

    /// Write response data
    ///
    /// # Errors
    ///
    /// Returns a violation under enforcement, or an encoding error.
    pub fn put<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), RuleError> {
        let value = encode(key, value)?;
        if self.traversing {
            if let Some(manifest) = self.frame.manifest.as_mut() {
                let present = self.response.contains(key);
                let checked = self.validator.check_write(manifest, key, present);
                self.settle(checked)?;
            }
        }
        self.response.insert(key, value);
        Ok(())
    }

    /// Unchecked view of the request store
    pub fn request_store(&self) -> &DataStore {
        &self.request
    }

    /// Unchecked view of the response store
    pub fn response_store(&self) -> &DataStore {
        &self.response
    }

    // Traversal state

    /// Freeze the request store and enable contract gating
    pub fn begin_traversal(&mut self) {
        self.traversing = true;
    }

    /// Leave traversal and clear the running node
    pub fn end_traversal(&mut self) {
        self.traversing = false;
        self.frame = NodeFrame::default();
    }

    /// Whether a traversal is in progress
    pub fn is_traversing(&self) -> bool {
        self.traversing
    }

    /// Install the node about to run
    pub fn set_current(&mut self, node: impl Into<String>, manifest: AccessManifest) {
        self.frame = NodeFrame {
            node: Some(node.into()),
            manifest: Some(manifest),
            violation: None,
        };
    }

    /// Remove and return the running node's state
    pub fn take_frame(&mut self) -> NodeFrame {
        std::mem::take(&mut self.frame)
    }

    /// Reinstate a saved node state
    pub fn restore_frame(&mut self, frame: NodeFrame) {
        self.frame = frame;
    }

    /// Name of the running node
    pub fn current_node(&self) -> Option<&str> {
        self.frame.node.as_deref()
    }

    /// Manifest of the running node, including any promotions so far
    pub fn manifest(&self) -> Option<&AccessManifest> {
        self.frame.manifest.as_ref()
    }

    /// Run the manifest self-test for the installed node, if enabled.
    ///
    /// Reported violations are recorded as ERROR events.
    ///
    /// # Errors
    ///
    /// Returns the first violation under enforcement.
    pub fn check_manifest(&mut self) -> Result<(), RuleError> {
        if !self.validator.pre_step_enabled() {
            return Ok(());
        }
        let Some(manifest) = self.frame.manifest.as_ref() else {
            return Ok(());
        };
        let request = &self.request;
        let response = &self.response;
        let found = self.validator.check_manifest(
            manifest,
            |key| request.contains(key),
            |key| response.contains(key),
        )?;
        for violation in found {
            self.status.add_event(
                Severity::Error,
                EventCategory::Exception,
                ErrorCode::Orch5003,
                violation.to_string(),
            );
        }
        Ok(())
    }

    /// Remove the first violation enforced since the running node was
    /// installed. Set even when the rule discarded the error it was handed.
    pub fn take_violation(&mut self) -> Option<AccessViolation> {
        self.frame.violation.take()
    }

    // Diagnostics

    /// Status of this call
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Mutable status of this call
    pub fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }

    /// Events added since the last call, which are then marked as recorded
    pub fn take_unrecorded(&mut self) -> Status {
        let pending = self.status.since(self.recorded);
        self.recorded = self.status.len();
        pending
    }

    /// Dry-run transcript entries, in visiting order
    pub fn test_results(&self) -> &[String] {
        &self.test_results
    }

    /// Append a dry-run transcript entry
    pub fn push_test_result(&mut self, entry: impl Into<String>) {
        self.test_results.push(entry.into());
    }

    // Nested workflows

    /// Install the runner used by [`Self::run_subflow`]
    pub fn set_subflow_runner(&mut self, runner: Arc<dyn SubflowRunner>) {
        self.subflow = Some(runner);
    }

    /// Run `rules` as a nested workflow sharing this context's stores
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Subflow` if no runner is installed or the nested
    /// run fails.
    pub fn run_subflow(&mut self, rules: &str) -> Result<bool, RuleError> {
        let runner = self.subflow.clone().ok_or_else(|| RuleError::Subflow {
            reason: "no sub-workflow runner installed".to_string(),
        })?;
        self.subflow_depth += 1;
        let result = runner.run_subflow(self, rules);
        self.subflow_depth -= 1;
        result
    }

    /// Number of nested workflows currently running, the caller's included
    pub fn subflow_depth(&self) -> usize {
        self.subflow_depth
    }

    fn gating_manifest(&self) -> Option<&AccessManifest> {
        if self.traversing {
            self.frame.manifest.as_ref()
        } else {
            None
        }
    }

    fn settle(&mut self, checked: Result<Verdict, AccessViolation>) -> Result<(), RuleError> {
        match checked {
            Ok(verdict) => {
                self.note(verdict);
                Ok(())
            }
            Err(violation) => {
                self.frame.violation.get_or_insert_with(|| violation.clone());
                Err(violation.into())
            }
        }
    }

    fn note(&mut self, verdict: Verdict) {
        if let Verdict::Reported(violation) = verdict {
            let node = self.frame.node.as_deref().unwrap_or("-");
            let detail = format!("{node}: {violation}");
            self.status.add_event_with_message(
                Severity::Warning,
                EventCategory::Contract,
                ErrorCode::Orch5003,
                "Data contract violation",
                detail,
            );
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("frame", &self.frame)
            .field("traversing", &self.traversing)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn encode<T: Serialize>(key: &str, value: T) -> Result<Value, RuleError> {
    serde_json::to_value(value).map_err(|e| {
        CoreError::Encoding {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, RuleError> {
    serde_json::from_value(value).map_err(|e| {
        CoreError::Decoding {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
