//! Status aggregation for one orchestration call.

use serde::{Deserialize, Serialize};
use switchyard_core::RunId;

use crate::event::{ErrorCode, EventCategory, Severity, StatusEvent};

/// Ordered event list plus the maximum severity seen so far.
///
/// Severity only ever rises. An event at `Severity::Ok` is recorded but
/// cannot lower a previous `Warning` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    severity: Severity,
    events: Vec<StatusEvent>,
    run_id: Option<RunId>,
}

impl Status {
    /// Create an empty status at `Severity::Ok`
    pub fn new() -> Self {
        Self {
            severity: Severity::Ok,
            events: Vec::new(),
            run_id: None,
        }
    }

    /// Tag this status and every later event with a run identifier.
    ///
    /// Events already recorded are tagged too.
    pub fn set_run(&mut self, run_id: RunId) {
        self.run_id = Some(run_id);
        for event in &mut self.events {
            event.run_id.get_or_insert(run_id);
        }
    }

    /// Run identifier, if assigned
    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Record an event using the code's default message
    pub fn add_event(
        &mut self,
        severity: Severity,
        category: EventCategory,
        code: ErrorCode,
        detail: impl Into<String>,
    ) {
        self.add_event_with_message(severity, category, code, code.description(), detail);
    }

    /// Record an event with an explicit message
    pub fn add_event_with_message(
        &mut self,
        severity: Severity,
        category: EventCategory,
        code: ErrorCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(StatusEvent::new(severity, category, code, message, detail));
    }

    /// Append a prepared event
    pub fn push(&mut self, mut event: StatusEvent) {
        if let Some(run_id) = self.run_id {
            event.run_id.get_or_insert(run_id);
        }
        self.severity = self.severity.max(event.severity);
        self.events.push(event);
    }

    /// Overall severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether any ERROR event has been recorded
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// Events in insertion order
    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    /// Number of ERROR events
    pub fn error_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_error()).count()
    }

    /// Events from index `from` on, as a status of their own
    pub fn since(&self, from: usize) -> Status {
        let mut tail = Status::new();
        tail.run_id = self.run_id;
        for event in self.events.iter().skip(from) {
            tail.push(event.clone());
        }
        tail
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_status_is_ok() {
        let status = Status::new();
        assert_eq!(status.severity(), Severity::Ok);
        assert!(status.is_empty());
        assert!(!status.is_error());
    }

    #[test]
    fn test_add_event_uses_code_description() {
        let mut status = Status::new();
        status.add_event(
            Severity::Error,
            EventCategory::Rule,
            ErrorCode::Orch1001,
            "no such rule",
        );

        let event = &status.events()[0];
        assert_eq!(event.message, "Unknown exception caught.");
        assert_eq!(event.detail, "no such rule");
        assert!(status.is_error());
        assert_eq!(status.error_count(), 1);
    }

    #[test]
    fn test_severity_never_decreases() {
        let mut status = Status::new();
        status.add_event(Severity::Error, EventCategory::Exception, ErrorCode::Orch5003, "a");
        status.add_event(Severity::Warning, EventCategory::Contract, ErrorCode::Orch5003, "b");
        status.add_event(Severity::Ok, EventCategory::Rule, ErrorCode::Unknown, "c");

        assert_eq!(status.severity(), Severity::Error);
        assert_eq!(status.len(), 3);
        assert_eq!(status.error_count(), 1);
    }

    #[test]
    fn test_set_run_tags_events() {
        let mut status = Status::new();
        status.add_event(Severity::Warning, EventCategory::Contract, ErrorCode::Orch5003, "early");
        let run = RunId::new();
        status.set_run(run);
        status.add_event(Severity::Warning, EventCategory::Contract, ErrorCode::Orch5003, "late");

        assert!(status.events().iter().all(|e| e.run_id == Some(run)));
        assert_eq!(status.run_id(), Some(run));
    }

    #[test]
    fn test_since_recomputes_severity() {
        let mut status = Status::new();
        status.set_run(RunId::new());
        status.add_event(Severity::Error, EventCategory::Exception, ErrorCode::Orch5003, "old");
        status.add_event(Severity::Warning, EventCategory::Contract, ErrorCode::Orch5003, "new");

        let tail = status.since(1);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail.events()[0].detail, "new");
        assert_eq!(tail.severity(), Severity::Warning);
        assert_eq!(tail.run_id(), status.run_id());
        assert!(status.since(5).is_empty());
    }

    fn severity_strategy() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Ok),
            Just(Severity::Warning),
            Just(Severity::Error),
        ]
    }

    proptest::proptest! {
        #[test]
        fn test_severity_is_maximum(severities in proptest::collection::vec(severity_strategy(), 0..20)) {
            let mut status = Status::new();
            for severity in &severities {
                status.add_event(*severity, EventCategory::Rule, ErrorCode::Unknown, "x");
            }
            let expected = severities.iter().copied().max().unwrap_or(Severity::Ok);
            prop_assert_eq!(status.severity(), expected);
            prop_assert_eq!(status.len(), severities.len());
        }
    }
}
