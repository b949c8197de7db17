//! SWITCHYARD Status Log
//!
//! Caller-visible diagnostics for an orchestration call. Every call
//! accumulates an ordered list of status events and a running maximum
//! severity; a recorder flushes them when the call ends.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod recorder;
pub mod status;

pub use event::{ErrorCode, EventCategory, Severity, StatusEvent};
pub use recorder::{EventRecorder, JsonLinesRecorder, MemoryRecorder, TracingRecorder};
pub use status::Status;
