//! Status event types.
//!
//! Events are plain serializable records; the recorder decides where they go.

use serde::{Deserialize, Serialize};
use switchyard_core::{EventId, RunId, Timestamp};

/// Event severity. Ordered so the maximum of a set is its overall severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Nothing to report
    Ok,
    /// Recoverable problem, traversal continued
    Warning,
    /// The call or one of its steps failed
    Error,
}

impl Severity {
    /// Whether this severity marks a failure
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// What produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    /// Rule set compilation or traversal
    Rule,
    /// A rule raised an error
    Exception,
    /// Declared data intent did not match store contents
    Contract,
}

/// Stable event codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Unknown exception caught
    #[serde(rename = "ORCH1001")]
    Orch1001,
    /// Missing attribute in request
    #[serde(rename = "ORCH5003")]
    Orch5003,
    /// Unknown error
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl ErrorCode {
    /// The code as it appears in persisted events
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orch1001 => "ORCH1001",
            Self::Orch5003 => "ORCH5003",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Default human-readable message for the code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Orch1001 => "Unknown exception caught.",
            Self::Orch5003 => "Missing attribute in request",
            Self::Unknown => "Unknown Error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic produced during an orchestration call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Unique event identifier
    pub event_id: EventId,
    /// Run the event belongs to, once known
    pub run_id: Option<RunId>,
    /// Severity
    pub severity: Severity,
    /// Producer category
    pub category: EventCategory,
    /// Stable code
    pub code: ErrorCode,
    /// Short message, usually the code description
    pub message: String,
    /// Free-form detail
    pub detail: String,
    /// When the event was raised
    pub timestamp: Timestamp,
}

impl StatusEvent {
    /// Create an event stamped with the current time
    pub fn new(
        severity: Severity,
        category: EventCategory,
        code: ErrorCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            run_id: None,
            severity,
            category,
            code,
            message: message.into(),
            detail: detail.into(),
            timestamp: Timestamp::now(),
        }
    }

    /// Attach the run identifier
    #[must_use]
    pub fn with_run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Whether the event has ERROR severity
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} {}. {}", self.severity, self.code, self.message, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(
            [Severity::Warning, Severity::Ok, Severity::Error].iter().max(),
            Some(&Severity::Error)
        );
    }

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::Orch1001.as_str(), "ORCH1001");
        assert_eq!(ErrorCode::Orch5003.description(), "Missing attribute in request");
        assert_eq!(ErrorCode::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_event_creation() {
        let run = RunId::new();
        let event = StatusEvent::new(
            Severity::Error,
            EventCategory::Exception,
            ErrorCode::Orch5003,
            "Unable to run CHECK",
            "boom",
        )
        .with_run(run);

        assert!(event.is_error());
        assert_eq!(event.run_id, Some(run));
        assert_eq!(event.to_string(), "[ERROR] ORCH5003 Unable to run CHECK. boom");
    }

    #[test]
    fn test_event_serializes_codes_as_strings() {
        let event = StatusEvent::new(
            Severity::Warning,
            EventCategory::Contract,
            ErrorCode::Orch5003,
            "m",
            "d",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["code"], "ORCH5003");
        assert_eq!(json["severity"], "WARNING");
        assert_eq!(json["category"], "CONTRACT");
    }
}
