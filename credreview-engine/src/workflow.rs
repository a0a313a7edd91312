//! Review workflow facade for a host UI.
//!
//! Bundles one lecturer's session with the draft store and the commit
//! orchestrator. Every reviewer action is applied to the session and its
//! effects are interpreted while the session lock is held, so the draft
//! store always sees actions in the order they were accepted.

use std::sync::Arc;

use credreview_core::state_machine::{Event, StagedVerdict};
use credreview_core::{Decision, LecturerId, ReviewError, SubjectRef};

use crate::commit::{CommitOrchestrator, CommitReport};
use crate::draft_store::PersistenceFailure;
use crate::interpreter::{execute_effects, InterpreterContext};
use crate::reconciliation::open_session;
use crate::session::{ReviewSession, SessionPhase, SharedSession};

/// State of a subject after a reviewer action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub decision: Decision,
    pub staged: Option<StagedVerdict>,
    /// Set when the decision changed in memory but its draft was not saved.
    pub persistence: Option<PersistenceFailure>,
}

pub struct ReviewWorkflow {
    session: SharedSession,
    orchestrator: Arc<CommitOrchestrator>,
}

impl ReviewWorkflow {
    /// Fetch the lecturer's submission, restore drafts and start a session.
    pub async fn open(
        orchestrator: Arc<CommitOrchestrator>,
        lecturer_id: &LecturerId,
    ) -> Result<Self, ReviewError> {
        let session = open_session(
            orchestrator.registry().as_ref(),
            orchestrator.drafts(),
            lecturer_id,
        )
        .await?;
        Ok(Self::from_session(orchestrator, session))
    }

    pub fn from_session(orchestrator: Arc<CommitOrchestrator>, session: ReviewSession) -> Self {
        Self {
            session: session.into_shared(),
            orchestrator,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub async fn lecturer_id(&self) -> LecturerId {
        self.session.lock().await.lecturer_id().clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.lock().await.phase()
    }

    /// Open an approval confirmation for a pending subject.
    pub async fn request_approve(
        &self,
        subject: &SubjectRef,
    ) -> Result<ActionOutcome, ReviewError> {
        self.act(subject, Event::ApproveRequested).await
    }

    /// Open a rejection confirmation, pre-filled with the subject's note.
    pub async fn request_reject(&self, subject: &SubjectRef) -> Result<ActionOutcome, ReviewError> {
        self.act(subject, Event::RejectRequested).await
    }

    pub async fn edit_staged_note(
        &self,
        subject: &SubjectRef,
        note: impl Into<String>,
    ) -> Result<ActionOutcome, ReviewError> {
        self.act(subject, Event::StagedNoteEdited { note: note.into() })
            .await
    }

    pub async fn confirm(&self, subject: &SubjectRef) -> Result<ActionOutcome, ReviewError> {
        self.act(subject, Event::Confirmed).await
    }

    pub async fn cancel_staging(&self, subject: &SubjectRef) -> Result<ActionOutcome, ReviewError> {
        self.act(subject, Event::StagingCancelled).await
    }

    /// Reset a decided subject to pending, keeping its note.
    pub async fn refresh(&self, subject: &SubjectRef) -> Result<ActionOutcome, ReviewError> {
        self.act(subject, Event::Refreshed).await
    }

    pub async fn commit(&self) -> Result<CommitReport, ReviewError> {
        self.orchestrator.commit(&self.session).await
    }

    pub async fn decision(&self, subject: &SubjectRef) -> Option<Decision> {
        self.session.lock().await.decision(subject).cloned()
    }

    pub async fn pending_subjects(&self) -> Vec<SubjectRef> {
        self.session.lock().await.pending_subjects()
    }

    async fn act(&self, subject: &SubjectRef, event: Event) -> Result<ActionOutcome, ReviewError> {
        let mut session = self.session.lock().await;
        let effects = session.apply(subject, event)?;

        let ctx = InterpreterContext {
            drafts: self.orchestrator.drafts(),
            lecturer_id: session.lecturer_id(),
            subject,
        };
        let persistence = execute_effects(&ctx, effects).await;

        let state = session
            .state(subject)
            .ok_or_else(|| ReviewError::UnknownSubject(subject.clone()))?;
        Ok(ActionOutcome {
            decision: state.decision.clone(),
            staged: state.staged.clone(),
            persistence,
        })
    }
}
