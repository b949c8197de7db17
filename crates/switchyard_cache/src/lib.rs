//! SWITCHYARD Cache
//!
//! A generic time-to-live cache and the compiled graph cache built on it.
//! Graphs are keyed by the raw rule set text they were compiled from.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod expiring;
pub mod graph;

pub use expiring::{CacheStats, CachedEntry, DEFAULT_TTL, ExpiringCache};
pub use graph::{CacheError, GraphCache};
