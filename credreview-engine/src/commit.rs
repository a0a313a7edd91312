//! Commit orchestration.
//!
//! A commit sends the lecturer decision first. Only if the registry accepts
//! it are the credential decisions sent, one at a time, with each failure
//! recorded rather than aborting the rest.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use credreview_core::{
    CommitPlan, Decision, FailureCause, LecturerId, Mutation, MutationFailure, ReviewError,
    SubjectId, SubjectKind, SubjectRef,
};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::draft_store::{DraftStore, PersistenceFailure};
use crate::registry::{dispatch_mutation, RegistryClient};
use crate::session::{ReviewSession, SharedSession};

/// Default bound on a single registry mutation.
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(15);

/// What happens to credential drafts once the lecturer mutation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftCleanupPolicy {
    /// Clear every credential draft group, whatever the fan-out outcome.
    #[default]
    LecturerGate,
    /// Clear drafts of subjects the registry accepted; keep the failed ones.
    SucceededOnly,
}

impl DraftCleanupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LecturerGate => "lecturer-gate",
            Self::SucceededOnly => "succeeded-only",
        }
    }
}

impl fmt::Display for DraftCleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftCleanupPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lecturer-gate" => Ok(Self::LecturerGate),
            "succeeded-only" => Ok(Self::SucceededOnly),
            other => bail!(
                "unknown draft cleanup policy '{}' (expected 'lecturer-gate' or 'succeeded-only')",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSettings {
    pub mutation_timeout: Duration,
    pub cleanup_policy: DraftCleanupPolicy,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            mutation_timeout: DEFAULT_MUTATION_TIMEOUT,
            cleanup_policy: DraftCleanupPolicy::default(),
        }
    }
}

/// Notified when a lecturer's review has been accepted by the registry.
#[async_trait]
pub trait CommitListener: Send + Sync {
    async fn on_lecturer_resolved(&self, lecturer_id: &LecturerId);
}

/// Result of one credential mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub subject: SubjectRef,
    pub result: Result<(), FailureCause>,
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure(&self) -> Option<MutationFailure> {
        self.result.as_ref().err().map(|cause| MutationFailure {
            subject: self.subject.clone(),
            cause: cause.clone(),
        })
    }
}

/// Outcome of a commit whose lecturer mutation succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub lecturer_id: LecturerId,
    /// Credential outcomes in the order they were sent.
    pub credentials: Vec<MutationOutcome>,
    /// Draft cleanup steps that did not reach the store.
    pub persistence_failures: Vec<PersistenceFailure>,
}

impl CommitReport {
    pub fn failures(&self) -> Vec<MutationFailure> {
        self.credentials
            .iter()
            .filter_map(MutationOutcome::failure)
            .collect()
    }

    pub fn succeeded_count(&self) -> usize {
        self.credentials.iter().filter(|o| o.is_success()).count()
    }

    pub fn is_full_success(&self) -> bool {
        self.credentials.iter().all(MutationOutcome::is_success)
    }

    /// One-line description suitable for a toast or log line.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} of {} credential decisions saved",
            self.succeeded_count(),
            self.credentials.len()
        );
        let failures = self.failures();
        if !failures.is_empty() {
            let details: Vec<String> = failures.iter().map(ToString::to_string).collect();
            summary.push_str("; ");
            summary.push_str(&details.join(", "));
        }
        summary
    }
}

/// Drives a review session's decisions to the registry.
pub struct CommitOrchestrator {
    registry: Arc<dyn RegistryClient>,
    drafts: DraftStore,
    settings: CommitSettings,
    listeners: Vec<Arc<dyn CommitListener>>,
}

impl CommitOrchestrator {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        drafts: DraftStore,
        settings: CommitSettings,
    ) -> Self {
        Self {
            registry,
            drafts,
            settings,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn CommitListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn settings(&self) -> &CommitSettings {
        &self.settings
    }

    /// Commit every decision in the session.
    ///
    /// Returns an error without contacting the registry if the session is
    /// incomplete, already committing, or holds a rejection without a note.
    /// A failed lecturer mutation reopens the session and leaves every draft
    /// in place. Credential failures are reported, not returned as errors.
    /// Dropping the future mid-commit leaves the phase to `CommitGuard`.
    pub async fn commit(&self, session: &SharedSession) -> Result<CommitReport, ReviewError> {
        let (plan, degree_drafts, certificate_drafts) = {
            let mut session = session.lock().await;
            let plan = session.begin_commit()?;
            (
                plan,
                session.decisions(SubjectKind::Degree),
                session.decisions(SubjectKind::Certificate),
            )
        };
        let lecturer_id = plan.lecturer_id.clone();
        let mut guard = CommitGuard::new(session);

        info!(
            "Committing review for lecturer {} ({} credential decision(s))",
            lecturer_id,
            plan.credential_count()
        );

        if let Err(cause) = self.send(&plan.lecturer).await {
            error!(
                "Lecturer {} mutation failed ({}); no credential decisions sent",
                lecturer_id, cause
            );
            session.lock().await.abort_commit();
            guard.disarm();
            return Err(ReviewError::LecturerMutationFailure { lecturer_id, cause });
        }

        let mut persistence_failures = Vec::new();
        if let Err(failure) = self
            .drafts
            .clear(&lecturer_id, Some(SubjectKind::Lecturer))
            .await
        {
            persistence_failures.push(failure);
        }
        guard.lecturer_resolved = true;
        self.notify_listeners(&lecturer_id).await;

        let credentials = self.fan_out(&plan).await;

        persistence_failures.extend(
            self.clean_up(&lecturer_id, &credentials, degree_drafts, certificate_drafts)
                .await,
        );

        session.lock().await.finish_commit();
        guard.disarm();

        let report = CommitReport {
            lecturer_id,
            credentials,
            persistence_failures,
        };
        if report.is_full_success() {
            info!("Commit for lecturer {}: {}", report.lecturer_id, report.summary());
        } else {
            warn!("Commit for lecturer {}: {}", report.lecturer_id, report.summary());
        }
        Ok(report)
    }

    /// Each listener gets the mutation timeout. One that overruns is
    /// abandoned so the commit can still finish.
    async fn notify_listeners(&self, lecturer_id: &LecturerId) {
        let after = self.settings.mutation_timeout;
        for listener in &self.listeners {
            if timeout(after, listener.on_lecturer_resolved(lecturer_id))
                .await
                .is_err()
            {
                warn!(
                    "Commit listener for lecturer {} did not finish within {:?}; continuing",
                    lecturer_id, after
                );
            }
        }
    }

    /// Send credential mutations one at a time. A failure never stops the rest.
    async fn fan_out(&self, plan: &CommitPlan) -> Vec<MutationOutcome> {
        let mut outcomes = Vec::with_capacity(plan.credential_count());
        for mutation in plan.credential_mutations() {
            let result = self.send(mutation).await;
            match &result {
                Ok(()) => debug!("{} saved", mutation.subject),
                Err(cause) => warn!("{} failed ({})", mutation.subject, cause),
            }
            outcomes.push(MutationOutcome {
                subject: mutation.subject.clone(),
                result,
            });
        }
        outcomes
    }

    /// Send one mutation, bounded by the configured timeout.
    async fn send(&self, mutation: &Mutation) -> Result<(), FailureCause> {
        let after = self.settings.mutation_timeout;
        match timeout(after, dispatch_mutation(self.registry.as_ref(), mutation)).await {
            Err(_) => Err(FailureCause::TimedOut { after }),
            Ok(Err(e)) => Err(FailureCause::Transport {
                error: format!("{:#}", e),
            }),
            Ok(Ok(ack)) if ack.is_success() => Ok(()),
            Ok(Ok(_)) => Err(FailureCause::Rejected),
        }
    }

    async fn clean_up(
        &self,
        lecturer_id: &LecturerId,
        credentials: &[MutationOutcome],
        degree_drafts: BTreeMap<SubjectId, Decision>,
        certificate_drafts: BTreeMap<SubjectId, Decision>,
    ) -> Vec<PersistenceFailure> {
        let mut failures = Vec::new();

        match self.settings.cleanup_policy {
            DraftCleanupPolicy::LecturerGate => {
                for kind in [SubjectKind::Degree, SubjectKind::Certificate] {
                    if let Err(failure) = self.drafts.clear(lecturer_id, Some(kind)).await {
                        failures.push(failure);
                    }
                }
            }
            DraftCleanupPolicy::SucceededOnly => {
                let failed: BTreeSet<&SubjectRef> = credentials
                    .iter()
                    .filter(|o| !o.is_success())
                    .map(|o| &o.subject)
                    .collect();

                for (kind, decisions) in [
                    (SubjectKind::Degree, degree_drafts),
                    (SubjectKind::Certificate, certificate_drafts),
                ] {
                    let kept: BTreeMap<SubjectId, Decision> = decisions
                        .into_iter()
                        .filter(|(id, _)| failed.contains(&SubjectRef::new(kind, id.clone())))
                        .collect();

                    let result = if kept.is_empty() {
                        self.drafts.clear(lecturer_id, Some(kind)).await
                    } else {
                        debug!(
                            "Keeping {} failed {} draft(s) for lecturer {}",
                            kept.len(),
                            kind,
                            lecturer_id
                        );
                        self.drafts.save_group(lecturer_id, kind, &kept).await
                    };
                    if let Err(failure) = result {
                        failures.push(failure);
                    }
                }
            }
        }

        failures
    }
}

/// Settles the session phase if a commit future is dropped mid-flight.
///
/// Before the lecturer mutation succeeded the session reopens. After it, the
/// lecturer is resolved on the registry and the session is closed.
struct CommitGuard {
    session: SharedSession,
    lecturer_resolved: bool,
    armed: bool,
}

impl CommitGuard {
    fn new(session: &SharedSession) -> Self {
        Self {
            session: Arc::clone(session),
            lecturer_resolved: false,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let lecturer_resolved = self.lecturer_resolved;
        warn!(
            "Commit cancelled {} the lecturer mutation succeeded",
            if lecturer_resolved { "after" } else { "before" }
        );

        let settle = move |session: &mut ReviewSession| {
            if lecturer_resolved {
                session.finish_commit();
            } else {
                session.abort_commit();
            }
        };

        match self.session.try_lock() {
            Ok(mut session) => settle(&mut *session),
            Err(_) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let session = Arc::clone(&self.session);
                    handle.spawn(async move {
                        settle(&mut *session.lock().await);
                    });
                }
                Err(_) => error!("Session locked and no runtime; commit phase left unsettled"),
            },
        }
    }
}
