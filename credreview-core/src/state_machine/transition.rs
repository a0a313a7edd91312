//! Pure decision transition function.
//!
//! Takes the current subject state and a reviewer event and returns the new
//! state plus the effects to execute. This function has NO side effects.
//! A refused event returns an error and the caller keeps the old state.

use super::effect::{Effect, LogLevel};
use super::event::Event;
use super::state::{StagedVerdict, SubjectState, Verdict};
use crate::decision::{is_blank, Decision};
use crate::error::TransitionError;
use crate::subject::ReviewStatus;

/// Result of a decision transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The new state after the transition.
    pub state: SubjectState,
    /// Effects to execute.
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SubjectState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    pub fn no_change(state: SubjectState) -> Self {
        Self {
            state,
            effects: vec![],
        }
    }
}

fn stage(
    state: &SubjectState,
    verdict: Verdict,
    event: &Event,
) -> Result<TransitionResult, TransitionError> {
    // Approved <-> Rejected must pass through Pending
    if state.status() != ReviewStatus::Pending {
        return Err(TransitionError::IllegalTransition {
            from: state.status(),
            event: event.name(),
        });
    }

    Ok(TransitionResult::new(
        SubjectState {
            decision: state.decision.clone(),
            staged: Some(StagedVerdict {
                verdict,
                note: state.decision.note.clone(),
            }),
        },
        vec![Effect::Log {
            level: LogLevel::Debug,
            message: format!("staged {:?}, awaiting confirmation", verdict),
        }],
    ))
}

/// Pure decision transition function.
pub fn transition(
    state: &SubjectState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.staged, event) {
        (_, event @ Event::ApproveRequested) => stage(state, Verdict::Approve, &event),
        (_, event @ Event::RejectRequested) => stage(state, Verdict::Reject, &event),

        (Some(staged), Event::StagedNoteEdited { note }) => Ok(TransitionResult::no_change(
            SubjectState {
                decision: state.decision.clone(),
                staged: Some(StagedVerdict {
                    verdict: staged.verdict,
                    note,
                }),
            },
        )),

        (Some(staged), Event::Confirmed) => {
            if staged.verdict == Verdict::Reject && is_blank(&staged.note) {
                return Err(TransitionError::InvalidRejection);
            }
            let decision = Decision::new(staged.verdict.target_status(), staged.note.clone());

            Ok(TransitionResult::new(
                SubjectState::new(decision.clone()),
                vec![
                    Effect::Log {
                        level: LogLevel::Info,
                        message: format!("decision confirmed as {}", decision.status),
                    },
                    Effect::PersistDraft { decision },
                ],
            ))
        }

        (None, event @ (Event::StagedNoteEdited { .. } | Event::Confirmed)) => {
            Err(TransitionError::NothingStaged { event: event.name() })
        }

        // Closing the prompt only drops the staged note edits
        (_, Event::StagingCancelled) => Ok(TransitionResult::no_change(SubjectState::new(
            state.decision.clone(),
        ))),

        (_, Event::Refreshed) => {
            if state.status() == ReviewStatus::Pending {
                return Ok(TransitionResult::no_change(SubjectState::new(
                    state.decision.clone(),
                )));
            }

            // The note survives the reset so a re-rejection can reuse it
            let decision = Decision::new(ReviewStatus::Pending, state.decision.note.clone());
            Ok(TransitionResult::new(
                SubjectState::new(decision.clone()),
                vec![
                    Effect::Log {
                        level: LogLevel::Info,
                        message: format!("decision reset from {} to PENDING", state.status()),
                    },
                    Effect::PersistDraft { decision },
                ],
            ))
        }
    }
}
