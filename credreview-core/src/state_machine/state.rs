//! State types for the per-subject decision machine.
//!
//! The persisted part of the state is the `Decision`. On top of that a
//! subject may have a staged verdict: the reviewer asked to approve or
//! reject and the confirmation prompt is open. Staged verdicts are never
//! persisted.

use crate::decision::Decision;
use crate::subject::ReviewStatus;

/// Target of a staged approve/reject request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    /// Status the subject lands in once the verdict is confirmed.
    pub fn target_status(&self) -> ReviewStatus {
        match self {
            Self::Approve => ReviewStatus::Approved,
            Self::Reject => ReviewStatus::Rejected,
        }
    }
}

/// A verdict waiting for explicit confirmation.
///
/// `note` is the draft note for this interaction only. It is pre-filled
/// from the decision's note and discarded if the prompt is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVerdict {
    pub verdict: Verdict,
    pub note: String,
}

/// Full state of one subject in a review session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubjectState {
    pub decision: Decision,
    pub staged: Option<StagedVerdict>,
}

impl SubjectState {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            staged: None,
        }
    }

    pub fn status(&self) -> ReviewStatus {
        self.decision.status
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }
}

impl From<Decision> for SubjectState {
    fn from(decision: Decision) -> Self {
        Self::new(decision)
    }
}
