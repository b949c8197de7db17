//! The orchestration facade.

use crate::config::OrchestrationConfig;
use crate::error::OrchestrationError;
use crate::request::OrchestrationRequest;
use std::sync::Arc;
use switchyard_cache::GraphCache;
use switchyard_log::{ErrorCode, EventCategory, EventRecorder, Severity, TracingRecorder};
use switchyard_plan::{Compiler, RuleGraph};
use switchyard_rules::{ExecutionContext, RuleError, RuleRegistry, SubflowRunner};
use switchyard_runtime::{ExecutionEngine, ExecutionResult};

const RULES_FAILED: &str = "Unable to process orchestration engine rules";
const SUB_RULES_FAILED: &str = "Unable to process orchestration engine sub rules";

/// Maximum sub-workflow nesting within one call
pub const MAX_SUBFLOW_DEPTH: usize = 32;

/// Runs workflows against caller-supplied contexts.
///
/// Cloning is cheap; clones share the graph cache and recorder. Each clone
/// installs itself as the context's sub-workflow runner for the duration of a
/// call.
#[derive(Clone)]
pub struct Orchestrator {
    compiler: Compiler,
    cache: Option<Arc<GraphCache>>,
    engine: ExecutionEngine,
    recorder: Arc<dyn EventRecorder>,
    config: OrchestrationConfig,
}

impl Orchestrator {
    /// Build an orchestrator over `registry`. A private graph cache is
    /// created when `config.cache_enabled` is set.
    pub fn new(registry: Arc<RuleRegistry>, config: OrchestrationConfig) -> Self {
        let compiler = Compiler::new(registry);
        let cache = config
            .cache_enabled
            .then(|| Arc::new(GraphCache::new(compiler.clone(), config.cache_ttl())));
        Self {
            compiler,
            cache,
            engine: ExecutionEngine::new(config.mode),
            recorder: Arc::new(TracingRecorder::new()),
            config,
        }
    }

    /// Flush diagnostics to `recorder` after every call
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Use a shared graph cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<GraphCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Compile on every call
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Graph cache, if any
    pub fn cache(&self) -> Option<&Arc<GraphCache>> {
        self.cache.as_ref()
    }

    /// Run the request's workflow.
    ///
    /// Returns `false` only when the call failed: the rule set did not
    /// compile, a rule raised an error, a contract violation was enforced, or
    /// the step limit was hit. The failure is recorded on the context's status
    /// as an ERROR event. A workflow whose last step returned `false` is
    /// still a successful call.
    pub fn run(&self, request: &mut OrchestrationRequest) -> bool {
        self.execute(request).is_ok()
    }

    /// Run the request's workflow, returning the traversal result.
    ///
    /// `Ok(None)` means the context already carried an ERROR event and the
    /// rules were not traversed. Events added since the request was last
    /// executed are flushed to the recorder on every path.
    ///
    /// # Errors
    ///
    /// Returns the failure that [`Self::run`] reports as `false`
    pub fn execute(
        &self,
        request: &mut OrchestrationRequest,
    ) -> Result<Option<ExecutionResult>, OrchestrationError> {
        let rules = request.rules().to_string();
        let selector = request.selector_name().to_string();
        let ctx = request.context_mut();

        let span = tracing::info_span!("orchestration", run = %ctx.run_id(), selector = %selector);
        let _entered = span.enter();

        ctx.set_contract(self.config.contract);
        ctx.set_subflow_runner(Arc::new(self.clone()));
        ctx.begin_traversal();

        let result = self.traverse(&rules, ctx);
        if let Err(err) = &result {
            tracing::error!(error = %err, "orchestration failed");
            ctx.status_mut().add_event_with_message(
                Severity::Error,
                EventCategory::Rule,
                ErrorCode::Orch1001,
                RULES_FAILED,
                err.to_string(),
            );
        }

        let pending = ctx.take_unrecorded();
        if let Err(err) = self.recorder.record(ctx.run_id(), &pending) {
            tracing::warn!(error = %err, "unable to record orchestration events");
        }
        ctx.end_traversal();
        result
    }

    /// Compiled graph for `rules`, from the cache when one is configured
    ///
    /// # Errors
    ///
    /// Returns error if the rule set does not compile
    pub fn graph(&self, rules: &str) -> Result<Arc<RuleGraph>, OrchestrationError> {
        match &self.cache {
            Some(cache) => cache
                .get_or_compile(rules)
                .map_err(|e| OrchestrationError::from_cache(rules, e)),
            None => self
                .compiler
                .compile(rules)
                .map(Arc::new)
                .map_err(|source| OrchestrationError::Compile {
                    rules: rules.to_string(),
                    source,
                }),
        }
    }

    fn traverse(
        &self,
        rules: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<Option<ExecutionResult>, OrchestrationError> {
        let graph = self.graph(rules)?;
        if ctx.status().is_error() {
            tracing::warn!("status already in error, skipping rules");
            return Ok(None);
        }
        let result = self.engine.run(&graph, ctx, true)?;
        tracing::info!(outcome = result.outcome, steps = result.steps, "orchestration complete");
        Ok(Some(result))
    }
}

impl SubflowRunner for Orchestrator {
    fn run_subflow(&self, ctx: &mut ExecutionContext, rules: &str) -> Result<bool, RuleError> {
        let parent = ctx.current_node().unwrap_or("-").to_string();

        let reason = if ctx.subflow_depth() > MAX_SUBFLOW_DEPTH {
            format!("limit of {MAX_SUBFLOW_DEPTH} nested rule sets reached")
        } else {
            let errors_before = ctx.status().error_count();
            let frame = ctx.take_frame();

            tracing::debug!(parent = %parent, depth = ctx.subflow_depth(), rules, "running sub rules");
            let result = self.graph(rules).and_then(|graph| {
                self.engine
                    .run(&graph, ctx, false)
                    .map_err(OrchestrationError::from)
            });

            ctx.restore_frame(frame);
            let new_errors = ctx.status().error_count().saturating_sub(errors_before);

            match result {
                Ok(result) if new_errors == 0 => return Ok(result.outcome),
                Ok(_) => format!("{new_errors} error event(s) recorded"),
                Err(err) => err.to_string(),
            }
        };

        tracing::error!(parent = %parent, reason = %reason, "sub rules failed");
        ctx.status_mut().add_event_with_message(
            Severity::Error,
            EventCategory::Rule,
            ErrorCode::Orch1001,
            SUB_RULES_FAILED,
            reason.clone(),
        );
        Err(RuleError::Subflow {
            reason: format!("unable to process sub rules from {parent}. {reason}"),
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("compiler", &self.compiler)
            .field("cache", &self.cache)
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{DefaultRuleSet, NamedRuleSet};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchyard_log::MemoryRecorder;
    use switchyard_plan::CompileError;
    use switchyard_policy::{AccessManifest, AccessViolation, ContractConfig};
    use switchyard_rules::{FnRule, Rule};
    use switchyard_runtime::{ExecutionError, MAX_STEPS, RunMode};

    fn registry(rules: Vec<Arc<dyn Rule>>) -> Arc<RuleRegistry> {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.register(rule).unwrap();
        }
        Arc::new(registry)
    }

    fn orchestrator(rules: Vec<Arc<dyn Rule>>, config: OrchestrationConfig) -> Orchestrator {
        Orchestrator::new(registry(rules), config)
    }

    fn has_event(request: &OrchestrationRequest, code: ErrorCode, message: &str) -> bool {
        request
            .context()
            .status()
            .events()
            .iter()
            .any(|e| e.code == code && e.message == message)
    }

    #[test]
    fn test_empty_workflow_succeeds() {
        let orch = orchestrator(vec![], OrchestrationConfig::default());
        let mut request = OrchestrationRequest::new(Arc::new(DefaultRuleSet::None));

        let result = orch.execute(&mut request).unwrap().unwrap();
        assert!(result.outcome);
        assert_eq!(result.steps, 2);
        assert!(!request.context().is_traversing());
        assert!(request.context().status().is_empty());
    }

    #[test]
    fn test_false_outcome_is_still_success() {
        let orch = orchestrator(
            vec![Arc::new(FnRule::constant("DECLINE", false))],
            OrchestrationConfig::default(),
        );
        let mut request = OrchestrationRequest::custom("DECLINE");

        let result = orch.execute(&mut request).unwrap().unwrap();
        assert!(!result.outcome);
        assert!(orch.run(&mut OrchestrationRequest::custom("DECLINE")));
    }

    #[test]
    fn test_custom_rules_override_selector() {
        let orch = orchestrator(
            vec![
                Arc::new(FnRule::new("QUOTE", |ctx| {
                    ctx.put("picked", "quote")?;
                    Ok(true)
                })),
                Arc::new(FnRule::new("RENEW", |ctx| {
                    ctx.put("picked", "renew")?;
                    Ok(true)
                })),
            ],
            OrchestrationConfig::default().with_contract(ContractConfig::off()),
        );
        let mut request = OrchestrationRequest::new(Arc::new(NamedRuleSet::new("QUOTE", "QUOTE")))
            .with_custom_rules("RENEW");

        assert!(orch.run(&mut request));
        assert_eq!(request.context().response_store().get("picked"), Some(&json!("renew")));
    }

    #[test]
    fn test_compile_error_returns_false() {
        let recorder = Arc::new(MemoryRecorder::new());
        let orch = orchestrator(vec![], OrchestrationConfig::default()).with_recorder(recorder.clone());
        let mut request = OrchestrationRequest::custom("MISSING");

        let err = orch.execute(&mut request).unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Compile {
                source: CompileError::UnknownRule { .. },
                ..
            }
        ));
        assert!(request.context().status().is_error());
        assert!(has_event(&request, ErrorCode::Orch1001, RULES_FAILED));

        let recorded = recorder.events_for(request.context().run_id());
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].severity, Severity::Error);
    }

    #[test]
    fn test_events_flushed_on_success() {
        let recorder = Arc::new(MemoryRecorder::new());
        let orch = orchestrator(
            vec![Arc::new(FnRule::new("PEEK", |ctx| {
                ctx.get_optional("undeclared")?;
                Ok(true)
            }))],
            OrchestrationConfig::default(),
        )
        .with_recorder(recorder.clone());
        let mut request = OrchestrationRequest::custom("PEEK");

        assert!(orch.run(&mut request));
        let recorded = recorder.events_for(request.context().run_id());
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].severity, Severity::Warning);
        assert_eq!(recorded[0].category, EventCategory::Contract);
    }

    #[test]
    fn test_rerun_records_only_new_events() {
        let recorder = Arc::new(MemoryRecorder::new());
        let orch = orchestrator(
            vec![Arc::new(FnRule::new("PEEK", |ctx| {
                ctx.get_optional("undeclared")?;
                Ok(true)
            }))],
            OrchestrationConfig::default(),
        )
        .with_recorder(recorder.clone());
        let mut request = OrchestrationRequest::custom("PEEK");

        assert!(orch.run(&mut request));
        assert!(orch.run(&mut request));
        assert_eq!(request.context().status().len(), 2);
        assert_eq!(recorder.events_for(request.context().run_id()).len(), 2);
    }

    #[test]
    fn test_existing_error_skips_rules() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let orch = orchestrator(
            vec![Arc::new(FnRule::new("COUNT", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }))],
            OrchestrationConfig::default(),
        );
        let mut request = OrchestrationRequest::custom("COUNT");
        request.context_mut().status_mut().add_event(
            Severity::Error,
            EventCategory::Exception,
            ErrorCode::Unknown,
            "upstream failure",
        );

        assert_eq!(orch.execute(&mut request).unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_create_then_modify_in_one_step() {
        let orch = orchestrator(
            vec![Arc::new(
                FnRule::new("PRICE", |ctx| {
                    ctx.put("x", 1)?;
                    ctx.put("x", 2)?;
                    Ok(true)
                })
                .with_manifest(AccessManifest::new().creates_output("x")),
            )],
            OrchestrationConfig::default().with_contract(ContractConfig::enforcing()),
        );
        let mut request = OrchestrationRequest::custom("PRICE");

        assert!(orch.run(&mut request));
        assert_eq!(request.context().response_store().get("x"), Some(&json!(2)));
        assert!(request.context().status().is_empty());
    }

    #[test]
    fn test_second_creator_fails_when_enforced() {
        let creator = |name: &str| -> Arc<dyn Rule> {
            Arc::new(
                FnRule::new(name, |ctx| {
                    ctx.put("x", 1)?;
                    Ok(true)
                })
                .with_manifest(AccessManifest::new().creates_output("x")),
            )
        };
        let orch = orchestrator(
            vec![creator("FIRST"), creator("SECOND")],
            OrchestrationConfig::default().with_contract(ContractConfig::enforcing()),
        );
        let mut request = OrchestrationRequest::custom("FIRST,SECOND");

        let err = orch.execute(&mut request).unwrap_err();
        match err {
            OrchestrationError::Execution(ExecutionError::HandlerFailed { node, source }) => {
                assert_eq!(node, "SECOND");
                assert_eq!(
                    source,
                    RuleError::Violation(AccessViolation::AlreadyPresent {
                        key: "x".to_string()
                    })
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_discarded_violation_fails_call() {
        let recorder = Arc::new(MemoryRecorder::new());
        let orch = orchestrator(
            vec![
                Arc::new(FnRule::new("SNEAK", |ctx| {
                    let _ = ctx.put("undeclared", 1);
                    Ok(true)
                })),
                Arc::new(FnRule::new("AFTER", |ctx| {
                    ctx.put("after", true)?;
                    Ok(true)
                })),
            ],
            OrchestrationConfig::default().with_contract(ContractConfig::enforcing()),
        )
        .with_recorder(recorder.clone());
        let mut request = OrchestrationRequest::custom("SNEAK,AFTER");

        let err = orch.execute(&mut request).unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Execution(ExecutionError::HandlerFailed {
                ref node,
                source: RuleError::Violation(AccessViolation::Undeclared { .. }),
            }) if node == "SNEAK"
        ));
        assert!(request.context().response_store().is_empty());
        assert!(request.context().status().is_error());
        assert!(has_event(&request, ErrorCode::Orch1001, RULES_FAILED));
        assert!(!recorder.events_for(request.context().run_id()).is_empty());
    }

    #[test]
    fn test_second_creator_reported_continues() {
        let creator = |name: &str| -> Arc<dyn Rule> {
            Arc::new(
                FnRule::new(name, |ctx| {
                    ctx.put("x", 1)?;
                    Ok(true)
                })
                .with_manifest(AccessManifest::new().creates_output("x")),
            )
        };
        let orch = orchestrator(vec![creator("FIRST"), creator("SECOND")], OrchestrationConfig::default());
        let mut request = OrchestrationRequest::custom("FIRST,SECOND");

        assert!(orch.run(&mut request));
        assert_eq!(request.context().status().severity(), Severity::Warning);
    }

    #[test]
    fn test_cycle_hits_step_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = |name: &str, calls: Arc<AtomicUsize>| -> Arc<dyn Rule> {
            Arc::new(FnRule::new(name, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }))
        };
        let orch = orchestrator(
            vec![counting("PING", calls.clone()), counting("PONG", calls.clone())],
            OrchestrationConfig::default(),
        );
        let mut request = OrchestrationRequest::custom("PING?PONG:END,PONG?PING:END");

        let err = orch.execute(&mut request).unwrap_err();
        assert_eq!(
            err,
            OrchestrationError::Execution(ExecutionError::LoopLimitExceeded { limit: MAX_STEPS })
        );
        // START took the first slot
        assert_eq!(calls.load(Ordering::SeqCst), MAX_STEPS - 1);
        assert!(has_event(&request, ErrorCode::Orch1001, RULES_FAILED));
    }

    #[test]
    fn test_dry_run_has_no_side_effects() {
        let orch = orchestrator(
            vec![
                Arc::new(
                    FnRule::new("WRITE", |ctx| {
                        ctx.put("x", 1)?;
                        Ok(false)
                    })
                    .with_manifest(AccessManifest::new().creates_output("x")),
                ),
                Arc::new(FnRule::constant("AFTER", true)),
            ],
            OrchestrationConfig::default().with_mode(RunMode::Test),
        );
        let mut request = OrchestrationRequest::custom("WRITE,AFTER");

        let result = orch.execute(&mut request).unwrap().unwrap();
        assert!(request.context().response_store().is_empty());
        assert_eq!(request.context().test_results().len(), 4);
        assert!(result.diagnostic.contains("Rule: WRITE"));
        assert!(result.diagnostic.contains("Created output: x"));
        assert!(result.diagnostic.contains("Rule: AFTER"));
    }

    #[test]
    fn test_cache_compiles_once() {
        let orch = orchestrator(
            vec![Arc::new(FnRule::constant("A", true))],
            OrchestrationConfig::default(),
        );
        for _ in 0..5 {
            assert!(orch.run(&mut OrchestrationRequest::custom("A")));
        }
        assert_eq!(orch.cache().map(|c| c.compilations()), Some(1));
    }

    #[test]
    fn test_without_cache() {
        let orch = orchestrator(
            vec![Arc::new(FnRule::constant("A", true))],
            OrchestrationConfig::default().with_cache(false),
        );
        assert!(orch.cache().is_none());
        assert!(orch.run(&mut OrchestrationRequest::custom("A")));
    }

    fn subflow_rules(absorb: bool) -> Vec<Arc<dyn Rule>> {
        let parent: Arc<dyn Rule> = if absorb {
            Arc::new(FnRule::new("PARENT", |ctx| Ok(ctx.run_subflow("SUB").unwrap_or(false))))
        } else {
            Arc::new(FnRule::new("PARENT", |ctx| ctx.run_subflow("SUB")))
        };
        vec![
            parent,
            Arc::new(FnRule::new("SUB", |ctx| {
                if ctx.request_optional("fail")?.is_some() {
                    return Err(RuleError::failed("sub step failed"));
                }
                ctx.put("sub", true)?;
                Ok(true)
            })),
            Arc::new(FnRule::new("RECOVER", |ctx| {
                ctx.put("recovered", true)?;
                Ok(true)
            })),
        ]
    }

    #[test]
    fn test_subflow_shares_stores() {
        let orch = orchestrator(
            subflow_rules(false),
            OrchestrationConfig::default().with_contract(ContractConfig::off()),
        );
        let mut request = OrchestrationRequest::custom("PARENT?END:RECOVER,RECOVER");

        let result = orch.execute(&mut request).unwrap().unwrap();
        assert!(result.outcome);
        assert_eq!(request.context().response_store().get("sub"), Some(&json!(true)));
        assert!(!request.context().response_store().contains("recovered"));
        assert!(request.context().status().is_empty());
    }

    #[test]
    fn test_subflow_failure_aborts_parent() {
        let orch = orchestrator(
            subflow_rules(false),
            OrchestrationConfig::default().with_contract(ContractConfig::off()),
        );
        let mut request = OrchestrationRequest::custom("PARENT?END:RECOVER,RECOVER");
        request.context_mut().put_request("fail", true).unwrap();

        let err = orch.execute(&mut request).unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Execution(ExecutionError::HandlerFailed {
                ref node,
                source: RuleError::Subflow { .. },
            }) if node == "PARENT"
        ));
        assert!(has_event(&request, ErrorCode::Orch1001, SUB_RULES_FAILED));
        assert!(has_event(&request, ErrorCode::Orch1001, RULES_FAILED));
        assert!(!request.context().response_store().contains("recovered"));
    }

    #[test]
    fn test_absorbed_subflow_failure_takes_false_edge() {
        let orch = orchestrator(
            subflow_rules(true),
            OrchestrationConfig::default().with_contract(ContractConfig::off()),
        );
        let mut request = OrchestrationRequest::custom("PARENT?END:RECOVER,RECOVER");
        request.context_mut().put_request("fail", true).unwrap();

        assert!(orch.run(&mut request));
        assert_eq!(request.context().response_store().get("recovered"), Some(&json!(true)));
        assert!(has_event(&request, ErrorCode::Orch1001, SUB_RULES_FAILED));
    }

    #[test]
    fn test_subflow_restores_parent_frame() {
        let orch = orchestrator(
            vec![
                Arc::new(
                    FnRule::new("PARENT", |ctx| {
                        ctx.run_subflow("SUB")?;
                        ctx.put("after", 1)?;
                        Ok(true)
                    })
                    .with_manifest(AccessManifest::new().creates_output("after")),
                ),
                Arc::new(
                    FnRule::new("SUB", |ctx| {
                        ctx.put("inner", 1)?;
                        Ok(true)
                    })
                    .with_manifest(AccessManifest::new().creates_output("inner")),
                ),
            ],
            OrchestrationConfig::default().with_contract(ContractConfig::enforcing()),
        );
        let mut request = OrchestrationRequest::custom("PARENT");

        assert!(orch.run(&mut request));
        assert_eq!(request.context().response_store().len(), 2);
    }

    #[test]
    fn test_recursive_subflow_is_bounded() {
        let orch = orchestrator(
            vec![Arc::new(FnRule::new("SELF", |ctx| ctx.run_subflow("SELF")))],
            OrchestrationConfig::default(),
        );
        let mut request = OrchestrationRequest::custom("SELF");

        assert!(!orch.run(&mut request));
        assert_eq!(request.context().subflow_depth(), 0);
        assert!(request.context().status().events().iter().any(|e| {
            e.message == SUB_RULES_FAILED && e.detail.contains("nested rule sets reached")
        }));
    }

    #[test]
    fn test_nesting_within_bound_succeeds() {
        let orch = orchestrator(
            vec![
                Arc::new(FnRule::new("OUTER", |ctx| ctx.run_subflow("MIDDLE"))),
                Arc::new(FnRule::new("MIDDLE", |ctx| ctx.run_subflow("INNER"))),
                Arc::new(FnRule::new("INNER", |ctx| {
                    assert_eq!(ctx.subflow_depth(), 2);
                    Ok(true)
                })),
            ],
            OrchestrationConfig::default(),
        );
        let mut request = OrchestrationRequest::custom("OUTER");

        let result = orch.execute(&mut request).unwrap().unwrap();
        assert!(result.outcome);
        assert!(request.context().status().is_empty());
    }

    #[test]
    fn test_subflow_compile_error_surfaces() {
        let orch = orchestrator(
            vec![Arc::new(FnRule::new("PARENT", |ctx| ctx.run_subflow("NOPE")))],
            OrchestrationConfig::default(),
        );
        let mut request = OrchestrationRequest::custom("PARENT");

        assert!(!orch.run(&mut request));
        assert!(has_event(&request, ErrorCode::Orch1001, SUB_RULES_FAILED));
    }
}
