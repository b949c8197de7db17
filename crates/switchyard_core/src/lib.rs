//! SWITCHYARD Core Types
//!
//! Pure types shared by every crate in the workspace: the common error
//! type, run and event identifiers, and metadata timestamps.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod time;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{EventId, RunId};
pub use time::{Duration, Timestamp};
