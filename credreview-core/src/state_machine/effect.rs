//! Effects (side effects as data).
//!
//! Effects describe what should happen as a result of a transition. The
//! engine's interpreter executes them against the draft store, which keeps
//! the transition logic testable without any storage.

use crate::decision::Decision;

/// All effects that can be produced by decision transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Mirror the subject's new decision into its draft group.
    PersistDraft { decision: Decision },

    /// Log a message (for debugging/tracing).
    Log { level: LogLevel, message: String },
}

/// Log level for logging effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
}
