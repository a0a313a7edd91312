//! Error types for review sessions.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::subject::{LecturerId, ReviewStatus, SubjectRef};

/// Why a single decision transition was refused.
///
/// Carries no subject identity; the session attaches that when it lifts
/// the error into a [`ReviewError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a rejection requires a non-empty note")]
    InvalidRejection,

    #[error("{event} is not allowed while the decision is {from}")]
    IllegalTransition {
        from: ReviewStatus,
        event: &'static str,
    },

    #[error("{event} requires an open confirmation")]
    NothingStaged { event: &'static str },
}

/// Why one remote mutation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The registry answered without a success flag, or with `false`.
    Rejected,
    /// The request did not complete (connection, HTTP status, decoding).
    Transport { error: String },
    /// No answer within the configured bound.
    TimedOut { after: Duration },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected by registry"),
            Self::Transport { error } => write!(f, "transport error: {}", error),
            Self::TimedOut { after } => write!(f, "timed out after {}s", after.as_secs()),
        }
    }
}

/// A credential mutation that failed during commit fan-out.
///
/// Collected into the commit report rather than returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFailure {
    pub subject: SubjectRef,
    pub cause: FailureCause,
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({})", self.subject, self.cause)
    }
}

/// Errors surfaced to the caller of a review session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("review is incomplete: {} subject(s) still pending", .pending.len())]
    IncompleteReview { pending: Vec<SubjectRef> },

    #[error("{subject} cannot be rejected without a note")]
    InvalidRejection { subject: SubjectRef },

    #[error("{subject}: {event} is not allowed while the decision is {from}")]
    IllegalTransition {
        subject: SubjectRef,
        from: ReviewStatus,
        event: &'static str,
    },

    #[error("{subject}: {event} requires an open confirmation")]
    NothingStaged {
        subject: SubjectRef,
        event: &'static str,
    },

    #[error("lecturer {lecturer_id} could not be committed: {cause}; decisions kept for retry")]
    LecturerMutationFailure {
        lecturer_id: LecturerId,
        cause: FailureCause,
    },

    #[error("a commit is already in progress for this review")]
    CommitInProgress,

    #[error("review for lecturer {0} has already been committed")]
    SessionClosed(LecturerId),

    #[error("{0} is not part of this review session")]
    UnknownSubject(SubjectRef),

    #[error("registry request failed: {0}")]
    Registry(String),
}

impl ReviewError {
    /// Attach the subject identity to a refused transition.
    pub fn from_transition(subject: SubjectRef, err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidRejection => Self::InvalidRejection { subject },
            TransitionError::IllegalTransition { from, event } => Self::IllegalTransition {
                subject,
                from,
                event,
            },
            TransitionError::NothingStaged { event } => Self::NothingStaged { subject, event },
        }
    }

    /// Returns true if the reviewer can fix the problem and try again
    /// within the same session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SessionClosed(_))
    }
}
