//! Repository abstraction for draft persistence.
//!
//! This module defines the `DraftRepository` trait that abstracts storage
//! of draft groups. A group holds every draft decision of one subject kind
//! for one lecturer, and is always read and written as a single unit.

mod memory;
mod sqlite;

pub use memory::InMemoryDraftRepository;
pub use sqlite::SqliteDraftRepository;

use std::fmt;

use async_trait::async_trait;
use credreview_core::{Decision, LecturerId, ReviewStatus, SubjectId, SubjectKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed composite key of a draft group.
///
/// Drafts of different lecturers never share a key, so several lecturers
/// can be reviewed side by side on one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DraftKey {
    pub owner_id: LecturerId,
    pub kind: SubjectKind,
}

impl DraftKey {
    pub fn new(owner_id: &LecturerId, kind: SubjectKind) -> Self {
        Self {
            owner_id: owner_id.clone(),
            kind,
        }
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.group_name(), self.owner_id)
    }
}

/// Persisted form of one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: SubjectId,
    pub status: ReviewStatus,
    #[serde(default)]
    pub note: String,
}

impl DraftRecord {
    pub fn new(id: SubjectId, decision: &Decision) -> Self {
        Self {
            id,
            status: decision.status,
            note: decision.note.clone(),
        }
    }

    pub fn decision(&self) -> Decision {
        Decision::new(self.status, self.note.clone())
    }
}

/// Errors from a draft repository backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("draft storage failed during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt draft data in {what}")]
    Corruption { what: String },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }
}

/// Repository trait for persisting draft groups.
///
/// Implementations provide the storage backend. `DraftStore` layers the
/// best-effort semantics on top, so implementations report every failure.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Get a draft group, returning None if it was never written.
    async fn get(&self, key: &DraftKey) -> Result<Option<Vec<DraftRecord>>, RepositoryError>;

    /// Store a draft group (replace semantics).
    async fn put(&self, key: &DraftKey, records: Vec<DraftRecord>) -> Result<(), RepositoryError>;

    /// Delete a draft group. Returns true if a group was removed.
    async fn delete(&self, key: &DraftKey) -> Result<bool, RepositoryError>;
}
