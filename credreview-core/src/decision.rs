//! The reviewer's working judgment for one subject.

use serde::{Deserialize, Serialize};

use crate::subject::ReviewStatus;

/// Returns true if a note has no visible content.
pub fn is_blank(note: &str) -> bool {
    note.trim().is_empty()
}

/// Status plus annotation for one subject.
///
/// A `Rejected` decision always carries a non-blank note; the state machine
/// refuses to produce one without it. A `Pending` decision may keep a note
/// from an earlier rejection so the reviewer does not lose the text when
/// toggling back and forth.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decision {
    pub status: ReviewStatus,
    #[serde(default)]
    pub note: String,
}

impl Decision {
    pub fn new(status: ReviewStatus, note: impl Into<String>) -> Self {
        Self {
            status,
            note: note.into(),
        }
    }

    pub fn pending() -> Self {
        Self::default()
    }

    pub fn approved() -> Self {
        Self::new(ReviewStatus::Approved, String::new())
    }

    pub fn rejected(note: impl Into<String>) -> Self {
        Self::new(ReviewStatus::Rejected, note)
    }

    pub fn is_decided(&self) -> bool {
        self.status.is_decided()
    }

    /// Returns false for a rejection without a usable note.
    pub fn satisfies_note_rule(&self) -> bool {
        self.status != ReviewStatus::Rejected || !is_blank(&self.note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending_without_note() {
        let decision = Decision::default();
        assert_eq!(decision.status, ReviewStatus::Pending);
        assert!(decision.note.is_empty());
        assert!(!decision.is_decided());
    }

    #[test]
    fn test_note_rule() {
        assert!(Decision::approved().satisfies_note_rule());
        assert!(Decision::pending().satisfies_note_rule());
        assert!(Decision::rejected("missing transcript").satisfies_note_rule());
        assert!(!Decision::rejected("").satisfies_note_rule());
        assert!(!Decision::rejected(" \t\n").satisfies_note_rule());
    }
}
