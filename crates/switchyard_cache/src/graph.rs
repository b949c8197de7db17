//! Compiled graph cache.
//!
//! Lookups take a short lock on the entry map. Compilation is serialized by
//! a second lock, and the map is re-checked once that lock is held, so
//! concurrent callers with the same rule set text compile it at most once.

use crate::expiring::{CacheStats, ExpiringCache};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use switchyard_core::{CoreError, Duration};
use switchyard_plan::{CompileError, Compiler, RuleGraph};

/// Graph cache error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The rule set did not compile
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// A lock was poisoned by a panicking thread
    #[error("graph cache lock poisoned")]
    Poisoned,
}

impl From<CacheError> for CoreError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Compile(e) => e.into(),
            CacheError::Poisoned => CoreError::internal("graph cache lock poisoned"),
        }
    }
}

/// Memoizes compiled rule graphs by rule set text
pub struct GraphCache {
    compiler: Compiler,
    entries: Mutex<ExpiringCache<String, Arc<RuleGraph>>>,
    compile_lock: Mutex<()>,
    compilations: AtomicU64,
}

impl GraphCache {
    /// Create a cache whose entries live for `ttl`
    #[must_use]
    pub fn new(compiler: Compiler, ttl: Duration) -> Self {
        Self {
            compiler,
            entries: Mutex::new(ExpiringCache::new(ttl)),
            compile_lock: Mutex::new(()),
            compilations: AtomicU64::new(0),
        }
    }

    /// Compiler used on a miss
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Cached graph for `rules`, compiling and storing it on a miss
    ///
    /// # Errors
    ///
    /// Returns error if compilation fails or a lock is poisoned. Failed
    /// compilations are not cached.
    pub fn get_or_compile(&self, rules: &str) -> Result<Arc<RuleGraph>, CacheError> {
        let key = rules.to_string();
        if let Some(graph) = self.entries()?.get(&key) {
            tracing::debug!(rules, "graph cache hit");
            return Ok(graph);
        }

        let _exclusive = self.compile_lock.lock().map_err(|_| CacheError::Poisoned)?;
        {
            let mut entries = self.entries()?;
            if entries.contains_key(&key) {
                if let Some(graph) = entries.get(&key) {
                    tracing::debug!(rules, "graph compiled by another caller");
                    return Ok(graph);
                }
            }
        }

        tracing::debug!(rules, "graph cache miss");
        let graph = Arc::new(self.compiler.compile(rules)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        self.entries()?.put(key, Arc::clone(&graph));
        Ok(graph)
    }

    /// Cached graph for `rules`, if live
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned
    pub fn get(&self, rules: &str) -> Result<Option<Arc<RuleGraph>>, CacheError> {
        Ok(self.entries()?.get(&rules.to_string()))
    }

    /// Drop the cached graph for `rules`
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned
    pub fn invalidate(&self, rules: &str) -> Result<bool, CacheError> {
        Ok(self.entries()?.remove(&rules.to_string()).is_some())
    }

    /// Drop every cached graph
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned
    pub fn clear(&self) -> Result<(), CacheError> {
        self.entries()?.clear();
        Ok(())
    }

    /// Number of compilations performed
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Hit, miss, and eviction counts
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(self.entries()?.stats())
    }

    fn entries(&self) -> Result<MutexGuard<'_, ExpiringCache<String, Arc<RuleGraph>>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache")
            .field("compiler", &self.compiler)
            .field("compilations", &self.compilations())
            .finish_non_exhaustive()
    }
}
