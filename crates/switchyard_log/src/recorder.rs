//! Event recorders.
//!
//! The orchestrator hands the final [`Status`] of every call to a recorder.
//! Recorder failures are reported to the caller of `record` but never
//! change the orchestration outcome.

use std::io::Write;
use std::sync::Mutex;

use switchyard_core::{CoreError, CoreResult, RunId};

use crate::event::{Severity, StatusEvent};
use crate::status::Status;

/// Sink for the events of a finished orchestration call
pub trait EventRecorder: Send + Sync {
    /// Record every event of `status` under `run_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the events.
    fn record(&self, run_id: RunId, status: &Status) -> CoreResult<()>;
}

/// Emits each event through `tracing` at a level matching its severity
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl TracingRecorder {
    /// Create a tracing recorder
    pub fn new() -> Self {
        Self
    }
}

impl EventRecorder for TracingRecorder {
    fn record(&self, run_id: RunId, status: &Status) -> CoreResult<()> {
        for event in status.events() {
            match event.severity {
                Severity::Error => tracing::error!(
                    run = %run_id,
                    code = %event.code,
                    category = ?event.category,
                    detail = %event.detail,
                    "{}", event.message
                ),
                Severity::Warning => tracing::warn!(
                    run = %run_id,
                    code = %event.code,
                    category = ?event.category,
                    detail = %event.detail,
                    "{}", event.message
                ),
                Severity::Ok => tracing::info!(
                    run = %run_id,
                    code = %event.code,
                    detail = %event.detail,
                    "{}", event.message
                ),
            }
        }
        tracing::debug!(run = %run_id, severity = %status.severity(), events = status.len(), "status recorded");
        Ok(())
    }
}

/// Keeps recorded events in memory
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<StatusEvent>>,
}

impl MemoryRecorder {
    /// Create an empty memory recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far
    pub fn events(&self) -> Vec<StatusEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events recorded for one run
    pub fn events_for(&self, run_id: RunId) -> Vec<StatusEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.run_id == Some(run_id))
            .collect()
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, run_id: RunId, status: &Status) -> CoreResult<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| CoreError::internal("memory recorder lock poisoned"))?;
        events.extend(status.events().iter().cloned().map(|mut e| {
            e.run_id.get_or_insert(run_id);
            e
        }));
        Ok(())
    }
}

/// Writes one JSON object per event to a byte sink
pub struct JsonLinesRecorder<W> {
    sink: Mutex<W>,
}

impl<W: Write + Send> JsonLinesRecorder<W> {
    /// Wrap a writer
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        match self.sink.into_inner() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> EventRecorder for JsonLinesRecorder<W> {
    fn record(&self, run_id: RunId, status: &Status) -> CoreResult<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| CoreError::internal("json recorder lock poisoned"))?;
        for event in status.events() {
            let mut event = event.clone();
            event.run_id.get_or_insert(run_id);
            let line = serde_json::to_string(&event).map_err(|e| CoreError::Encoding {
                key: event.event_id.to_string(),
                reason: e.to_string(),
            })?;
            writeln!(sink, "{line}").map_err(|e| CoreError::internal(e.to_string()))?;
        }
        sink.flush().map_err(|e| CoreError::internal(e.to_string()))
    }
}

impl<W> std::fmt::Debug for JsonLinesRecorder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesRecorder").finish_non_exhaustive()
    }
}
