//! Local observer notifications
//!
//! Mirrors the wire protocol loosely but stays in-process: embedders that
//! want to watch run progress take the event receiver once and consume
//! these.

use crate::results::RunCounters;

/// In-process notifications emitted while a run progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A test run was requested by the server
    Execute,
    /// All assets executed; the framework is about to take over
    Start,
    /// One result was aggregated
    Result {
        completed: u64,
        total: Option<u64>,
    },
    /// The run finished, with the final counters
    Complete { counters: RunCounters },
}
