//! Best-effort draft store for in-progress review decisions.
//!
//! This module wraps a `DraftRepository` with the semantics a review dialog
//! needs: loading never fails (a corrupt draft must not block the reviewer),
//! and writes are best effort (the in-memory decision stays authoritative
//! for the current session whatever the store does).

pub mod repository;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use credreview_core::{Decision, LecturerId, SubjectId, SubjectKind};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use repository::{
    DraftKey, DraftRecord, DraftRepository, InMemoryDraftRepository, RepositoryError,
    SqliteDraftRepository,
};

/// File name of the on-device draft database inside the state directory.
pub const DRAFT_DB_FILE_NAME: &str = "review-drafts.db";

/// A draft write or delete that did not reach the store.
///
/// Never fatal: callers log it and may show a non-blocking warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("draft group {key} was not persisted: {error}")]
pub struct PersistenceFailure {
    pub key: DraftKey,
    pub error: RepositoryError,
}

/// Drafts of all three groups for one lecturer, as loaded at session start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DraftSnapshot {
    pub lecturer: BTreeMap<SubjectId, Decision>,
    pub degrees: BTreeMap<SubjectId, Decision>,
    pub certificates: BTreeMap<SubjectId, Decision>,
}

impl DraftSnapshot {
    pub fn group(&self, kind: SubjectKind) -> &BTreeMap<SubjectId, Decision> {
        match kind {
            SubjectKind::Lecturer => &self.lecturer,
            SubjectKind::Degree => &self.degrees,
            SubjectKind::Certificate => &self.certificates,
        }
    }

    fn group_mut(&mut self, kind: SubjectKind) -> &mut BTreeMap<SubjectId, Decision> {
        match kind {
            SubjectKind::Lecturer => &mut self.lecturer,
            SubjectKind::Degree => &mut self.degrees,
            SubjectKind::Certificate => &mut self.certificates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lecturer.is_empty() && self.degrees.is_empty() && self.certificates.is_empty()
    }
}

/// Draft store shared by the review session and the commit orchestrator.
#[derive(Clone)]
pub struct DraftStore {
    repo: Arc<dyn DraftRepository>,
}

impl DraftStore {
    pub fn new(repo: Arc<dyn DraftRepository>) -> Self {
        Self { repo }
    }

    /// Create a store that keeps drafts in memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDraftRepository::new()))
    }

    /// Open or create the on-device draft database at the given path.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let path = db_path.to_path_buf();
        let repo = tokio::task::spawn_blocking(move || SqliteDraftRepository::new(&path))
            .await
            .context("spawn_blocking panicked")?
            .with_context(|| format!("Failed to open draft database at {}", db_path.display()))?;

        info!("Opened draft database at {}", db_path.display());
        Ok(Self::new(Arc::new(repo)))
    }

    /// Load one draft group as a map of subject ID to decision.
    ///
    /// Never fails: a missing, unreadable or malformed group yields an empty
    /// map. Records that break the rejection note rule are dropped.
    pub async fn load(
        &self,
        lecturer_id: &LecturerId,
        kind: SubjectKind,
    ) -> BTreeMap<SubjectId, Decision> {
        let key = DraftKey::new(lecturer_id, kind);

        let records = match self.repo.get(&key).await {
            Ok(Some(records)) => records,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable draft group {}: {}", key, e);
                return BTreeMap::new();
            }
        };

        let mut decisions = BTreeMap::new();
        for record in records {
            let decision = record.decision();
            if !decision.satisfies_note_rule() {
                warn!(
                    "Dropping draft for {} in {}: rejection without a note",
                    record.id, key
                );
                continue;
            }
            decisions.insert(record.id, decision);
        }

        debug!("Loaded {} draft(s) from {}", decisions.len(), key);
        decisions
    }

    /// Load all three draft groups for a lecturer.
    pub async fn snapshot(&self, lecturer_id: &LecturerId) -> DraftSnapshot {
        let mut snapshot = DraftSnapshot::default();
        for kind in SubjectKind::ALL {
            *snapshot.group_mut(kind) = self.load(lecturer_id, kind).await;
        }
        snapshot
    }

    /// Upsert one decision into its draft group.
    ///
    /// The whole group is rewritten as one unit. A group that cannot be read
    /// back is replaced rather than merged.
    pub async fn save(
        &self,
        lecturer_id: &LecturerId,
        kind: SubjectKind,
        subject_id: &SubjectId,
        decision: &Decision,
    ) -> Result<(), PersistenceFailure> {
        let key = DraftKey::new(lecturer_id, kind);

        let mut records = match self.repo.get(&key).await {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                warn!("Replacing unreadable draft group {}: {}", key, e);
                Vec::new()
            }
        };

        let record = DraftRecord::new(subject_id.clone(), decision);
        match records.iter_mut().find(|r| &r.id == subject_id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        self.write_group(key, records).await
    }

    /// Replace a draft group with exactly the given decisions.
    pub async fn save_group(
        &self,
        lecturer_id: &LecturerId,
        kind: SubjectKind,
        decisions: &BTreeMap<SubjectId, Decision>,
    ) -> Result<(), PersistenceFailure> {
        let key = DraftKey::new(lecturer_id, kind);
        let records = decisions
            .iter()
            .map(|(id, decision)| DraftRecord::new(id.clone(), decision))
            .collect();
        self.write_group(key, records).await
    }

    async fn write_group(
        &self,
        key: DraftKey,
        records: Vec<DraftRecord>,
    ) -> Result<(), PersistenceFailure> {
        let count = records.len();
        match self.repo.put(&key, records).await {
            Ok(()) => {
                debug!("Persisted {} draft(s) to {}", count, key);
                Ok(())
            }
            Err(error) => {
                warn!("Failed to persist draft group {}: {}", key, error);
                Err(PersistenceFailure { key, error })
            }
        }
    }

    /// Remove a lecturer's draft group, or all three groups if `kind` is None.
    ///
    /// Every group is attempted; the first failure is returned.
    pub async fn clear(
        &self,
        lecturer_id: &LecturerId,
        kind: Option<SubjectKind>,
    ) -> Result<(), PersistenceFailure> {
        let kinds: Vec<SubjectKind> = match kind {
            Some(kind) => vec![kind],
            None => SubjectKind::ALL.to_vec(),
        };

        let mut first_failure = None;
        for kind in kinds {
            let key = DraftKey::new(lecturer_id, kind);
            match self.repo.delete(&key).await {
                Ok(removed) => {
                    if removed {
                        debug!("Cleared draft group {}", key);
                    }
                }
                Err(error) => {
                    warn!("Failed to clear draft group {}: {}", key, error);
                    first_failure.get_or_insert(PersistenceFailure { key, error });
                }
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}
