//! Reviewer actions that drive the per-subject decision machine.

use std::fmt;

/// All events a reviewer can raise against one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Reviewer clicked "approve"; opens the confirmation prompt.
    ApproveRequested,

    /// Reviewer clicked "reject"; opens the confirmation prompt with the
    /// note editor.
    RejectRequested,

    /// Reviewer edited the note inside an open confirmation prompt.
    StagedNoteEdited { note: String },

    /// Reviewer confirmed the staged verdict.
    Confirmed,

    /// Reviewer closed the confirmation prompt without confirming.
    StagingCancelled,

    /// Reviewer reset a decided subject back to pending.
    Refreshed,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApproveRequested => "ApproveRequested",
            Self::RejectRequested => "RejectRequested",
            Self::StagedNoteEdited { .. } => "StagedNoteEdited",
            Self::Confirmed => "Confirmed",
            Self::StagingCancelled => "StagingCancelled",
            Self::Refreshed => "Refreshed",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
