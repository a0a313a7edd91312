//! In-memory review session for one lecturer.
//!
//! The session owns the working copy of every decision. Reviewer actions
//! run through the pure transition function in `credreview_core`, and the
//! resulting effects are handed back to the caller for interpretation.

use std::collections::BTreeMap;
use std::sync::Arc;

use credreview_core::state_machine::{transition, Effect, Event, SubjectState};
use credreview_core::{
    CommitPlan, Decision, LecturerId, Mutation, ReviewError, SubjectId, SubjectKind, SubjectRef,
};
use tokio::sync::Mutex;

/// Where a session is in its commit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Accepting reviewer actions.
    #[default]
    Open,
    /// Mutations are in flight. Actions and repeat commits are refused.
    Committing,
    /// The lecturer mutation succeeded. The session is read-only.
    Committed,
}

/// Session shared between the reviewer's actions and a running commit.
///
/// The lock is never held across a registry call.
pub type SharedSession = Arc<Mutex<ReviewSession>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSession {
    lecturer_id: LecturerId,
    lecturer: SubjectState,
    degrees: BTreeMap<SubjectId, SubjectState>,
    certificates: BTreeMap<SubjectId, SubjectState>,
    phase: SessionPhase,
}

impl ReviewSession {
    pub fn new(
        lecturer_id: LecturerId,
        lecturer: Decision,
        degrees: BTreeMap<SubjectId, Decision>,
        certificates: BTreeMap<SubjectId, Decision>,
    ) -> Self {
        Self {
            lecturer_id,
            lecturer: SubjectState::new(lecturer),
            degrees: degrees
                .into_iter()
                .map(|(id, d)| (id, SubjectState::new(d)))
                .collect(),
            certificates: certificates
                .into_iter()
                .map(|(id, d)| (id, SubjectState::new(d)))
                .collect(),
            phase: SessionPhase::Open,
        }
    }

    pub fn lecturer_id(&self) -> &LecturerId {
        &self.lecturer_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Every subject in commit order: lecturer, degrees, certificates.
    pub fn subjects(&self) -> Vec<SubjectRef> {
        let mut subjects = vec![SubjectRef::lecturer(&self.lecturer_id)];
        subjects.extend(self.degrees.keys().cloned().map(SubjectRef::degree));
        subjects.extend(self.certificates.keys().cloned().map(SubjectRef::certificate));
        subjects
    }

    pub fn state(&self, subject: &SubjectRef) -> Option<&SubjectState> {
        match subject.kind {
            SubjectKind::Lecturer => {
                (subject.id.0 == self.lecturer_id.0).then_some(&self.lecturer)
            }
            SubjectKind::Degree => self.degrees.get(&subject.id),
            SubjectKind::Certificate => self.certificates.get(&subject.id),
        }
    }

    fn state_mut(&mut self, subject: &SubjectRef) -> Option<&mut SubjectState> {
        match subject.kind {
            SubjectKind::Lecturer => {
                (subject.id.0 == self.lecturer_id.0).then_some(&mut self.lecturer)
            }
            SubjectKind::Degree => self.degrees.get_mut(&subject.id),
            SubjectKind::Certificate => self.certificates.get_mut(&subject.id),
        }
    }

    pub fn decision(&self, subject: &SubjectRef) -> Option<&Decision> {
        self.state(subject).map(|s| &s.decision)
    }

    /// Decisions of one group, keyed by subject ID.
    pub fn decisions(&self, kind: SubjectKind) -> BTreeMap<SubjectId, Decision> {
        match kind {
            SubjectKind::Lecturer => BTreeMap::from([(
                SubjectId::from(&self.lecturer_id),
                self.lecturer.decision.clone(),
            )]),
            SubjectKind::Degree => collect_decisions(&self.degrees),
            SubjectKind::Certificate => collect_decisions(&self.certificates),
        }
    }

    /// Subjects still awaiting a verdict, in commit order.
    pub fn pending_subjects(&self) -> Vec<SubjectRef> {
        self.subjects()
            .into_iter()
            .filter(|subject| {
                self.decision(subject)
                    .is_some_and(|decision| !decision.is_decided())
            })
            .collect()
    }

    /// True when no decision is pending.
    pub fn is_commit_eligible(&self) -> bool {
        self.pending_subjects().is_empty()
    }

    fn ensure_open(&self) -> Result<(), ReviewError> {
        match self.phase {
            SessionPhase::Open => Ok(()),
            SessionPhase::Committing => Err(ReviewError::CommitInProgress),
            SessionPhase::Committed => Err(ReviewError::SessionClosed(self.lecturer_id.clone())),
        }
    }

    /// Apply a reviewer action to one subject.
    ///
    /// On error the subject's state is left exactly as it was.
    pub fn apply(
        &mut self,
        subject: &SubjectRef,
        event: Event,
    ) -> Result<Vec<Effect>, ReviewError> {
        self.ensure_open()?;

        let state = self
            .state_mut(subject)
            .ok_or_else(|| ReviewError::UnknownSubject(subject.clone()))?;

        let result = transition(state, event)
            .map_err(|e| ReviewError::from_transition(subject.clone(), e))?;
        *state = result.state;
        Ok(result.effects)
    }

    /// Build the mutations a commit would send, or say why it cannot run.
    pub fn commit_plan(&self) -> Result<CommitPlan, ReviewError> {
        let pending = self.pending_subjects();
        if !pending.is_empty() {
            return Err(ReviewError::IncompleteReview { pending });
        }

        let mut mutations = Vec::new();
        for subject in self.subjects() {
            let Some(decision) = self.decision(&subject) else {
                continue;
            };
            if !decision.satisfies_note_rule() {
                return Err(ReviewError::InvalidRejection { subject });
            }
            if let Some(mutation) = Mutation::from_decision(subject, decision) {
                mutations.push(mutation);
            }
        }

        let mut mutations = mutations.into_iter();
        let lecturer = mutations.next().ok_or_else(|| ReviewError::IncompleteReview {
            pending: vec![SubjectRef::lecturer(&self.lecturer_id)],
        })?;
        let (degrees, certificates): (Vec<Mutation>, Vec<Mutation>) =
            mutations.partition(|m| m.subject.kind == SubjectKind::Degree);

        Ok(CommitPlan {
            lecturer_id: self.lecturer_id.clone(),
            lecturer,
            degrees,
            certificates,
        })
    }

    /// Check every precondition and move to `Committing`.
    pub fn begin_commit(&mut self) -> Result<CommitPlan, ReviewError> {
        self.ensure_open()?;
        let plan = self.commit_plan()?;
        self.phase = SessionPhase::Committing;
        Ok(plan)
    }

    /// Reopen the session after the lecturer mutation failed.
    pub fn abort_commit(&mut self) {
        if self.phase == SessionPhase::Committing {
            self.phase = SessionPhase::Open;
        }
    }

    pub fn finish_commit(&mut self) {
        self.phase = SessionPhase::Committed;
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }
}

fn collect_decisions(
    states: &BTreeMap<SubjectId, SubjectState>,
) -> BTreeMap<SubjectId, Decision> {
    states
        .iter()
        .map(|(id, state)| (id.clone(), state.decision.clone()))
        .collect()
}
