//! Remote mutations derived from a complete set of decisions.

use crate::decision::Decision;
use crate::subject::{LecturerId, ReviewStatus, SubjectRef};

/// What to tell the registry about one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationAction {
    Approve,
    Reject { note: String },
}

/// One remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub subject: SubjectRef,
    pub action: MutationAction,
}

impl Mutation {
    /// Build the mutation for a decided subject. Pending decisions have none.
    pub fn from_decision(subject: SubjectRef, decision: &Decision) -> Option<Self> {
        let action = match decision.status {
            ReviewStatus::Pending => return None,
            ReviewStatus::Approved => MutationAction::Approve,
            ReviewStatus::Rejected => MutationAction::Reject {
                note: decision.note.clone(),
            },
        };
        Some(Self { subject, action })
    }
}

/// Every mutation a commit will issue, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    pub lecturer_id: LecturerId,
    pub lecturer: Mutation,
    pub degrees: Vec<Mutation>,
    pub certificates: Vec<Mutation>,
}

impl CommitPlan {
    /// Credential mutations: degrees first, then certificates.
    pub fn credential_mutations(&self) -> impl Iterator<Item = &Mutation> {
        self.degrees.iter().chain(self.certificates.iter())
    }

    pub fn credential_count(&self) -> usize {
        self.degrees.len() + self.certificates.len()
    }
}
