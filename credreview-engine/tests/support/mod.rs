//! Scripted in-process registry shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use credreview_core::{LecturerId, LecturerSubmission, SubjectId, SubjectRef, SubmittedItem};
use credreview_engine::{
    CommitOrchestrator, CommitSettings, DraftStore, MutationAck, PendingQueue, RegistryClient,
    ReviewWorkflow,
};

/// How the registry answers one scripted call.
#[derive(Debug, Clone)]
pub enum Reply {
    Ack,
    Refuse,
    /// A 200 response whose body has no `success` flag.
    MissingFlag,
    Error(&'static str),
    /// Never answers.
    Hang,
}

#[derive(Default)]
pub struct ScriptedRegistry {
    submissions: Mutex<HashMap<LecturerId, LecturerSubmission>>,
    pending: Mutex<Vec<LecturerId>>,
    /// Keyed by `"<method> <id>"`, e.g. `"approve_degree D2"`.
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve a submission and list the lecturer as pending.
    pub fn add_submission(&self, submission: LecturerSubmission) {
        let id = submission.lecturer_id();
        self.submissions.lock().unwrap().insert(id.clone(), submission);
        self.pending.lock().unwrap().push(id);
    }

    pub fn reply(&self, call: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(call.to_string(), reply);
    }

    /// Every mutation received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn mutate(&self, method: &str, id: &str, note: Option<&str>) -> Result<MutationAck> {
        let call = match note {
            Some(note) => format!("{} {} '{}'", method, id, note),
            None => format!("{} {}", method, id),
        };
        self.calls.lock().unwrap().push(call);

        let key = format!("{} {}", method, id);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(Reply::Ack);

        match reply {
            Reply::Ack => {
                if method.ends_with("_lecturer") {
                    self.pending.lock().unwrap().retain(|l| l.0 != id);
                }
                Ok(MutationAck::succeeded())
            }
            Reply::Refuse => Ok(MutationAck::refused()),
            Reply::MissingFlag => Ok(MutationAck { success: None }),
            Reply::Error(message) => Err(anyhow!(message)),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl RegistryClient for ScriptedRegistry {
    async fn fetch_lecturer_submission(
        &self,
        lecturer_id: &LecturerId,
    ) -> Result<LecturerSubmission> {
        self.submissions
            .lock()
            .unwrap()
            .get(lecturer_id)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: lecturer {}", lecturer_id))
    }

    /// Scripted under the bare method name, `"fetch_pending_lecturers"`.
    async fn fetch_pending_lecturers(&self) -> Result<Vec<LecturerId>> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get("fetch_pending_lecturers")
            .cloned();
        match reply {
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Error(message)) => Err(anyhow!(message)),
            _ => Ok(self.pending.lock().unwrap().clone()),
        }
    }

    async fn approve_lecturer(&self, id: &LecturerId) -> Result<MutationAck> {
        self.mutate("approve_lecturer", &id.0, None).await
    }

    async fn reject_lecturer(&self, id: &LecturerId, note: &str) -> Result<MutationAck> {
        self.mutate("reject_lecturer", &id.0, Some(note)).await
    }

    async fn approve_degree(&self, id: &SubjectId) -> Result<MutationAck> {
        self.mutate("approve_degree", &id.0, None).await
    }

    async fn reject_degree(&self, id: &SubjectId, note: &str) -> Result<MutationAck> {
        self.mutate("reject_degree", &id.0, Some(note)).await
    }

    async fn approve_certification(&self, id: &SubjectId) -> Result<MutationAck> {
        self.mutate("approve_certification", &id.0, None).await
    }

    async fn reject_certification(&self, id: &SubjectId, note: &str) -> Result<MutationAck> {
        self.mutate("reject_certification", &id.0, Some(note)).await
    }
}

/// A submission with every subject pending on the registry side.
pub fn pending_submission(
    lecturer: &str,
    degrees: &[&str],
    certificates: &[&str],
) -> LecturerSubmission {
    LecturerSubmission {
        lecturer: SubmittedItem::new(lecturer, Some("PENDING"), None),
        degrees: degrees
            .iter()
            .map(|id| SubmittedItem::new(*id, Some("PENDING"), None))
            .collect(),
        certificates: certificates
            .iter()
            .map(|id| SubmittedItem::new(*id, None, None))
            .collect(),
    }
}

pub struct Harness {
    pub registry: Arc<ScriptedRegistry>,
    pub drafts: DraftStore,
    pub queue: Arc<PendingQueue>,
    pub orchestrator: Arc<CommitOrchestrator>,
}

impl Harness {
    pub async fn new(registry: Arc<ScriptedRegistry>, drafts: DraftStore) -> Self {
        Self::with_settings(registry, drafts, CommitSettings::default()).await
    }

    pub async fn with_settings(
        registry: Arc<ScriptedRegistry>,
        drafts: DraftStore,
        settings: CommitSettings,
    ) -> Self {
        credreview_engine::init_tracing();

        let queue = Arc::new(PendingQueue::new(registry.clone()));
        queue.refresh().await.unwrap();

        let orchestrator = Arc::new(
            CommitOrchestrator::new(registry.clone(), drafts.clone(), settings)
                .with_listener(queue.clone()),
        );

        Self {
            registry,
            drafts,
            queue,
            orchestrator,
        }
    }

    pub async fn open(&self, lecturer: &str) -> ReviewWorkflow {
        ReviewWorkflow::open(self.orchestrator.clone(), &LecturerId::from(lecturer))
            .await
            .unwrap()
    }
}

pub async fn approve(workflow: &ReviewWorkflow, subject: &SubjectRef) {
    workflow.request_approve(subject).await.unwrap();
    workflow.confirm(subject).await.unwrap();
}

pub async fn reject(workflow: &ReviewWorkflow, subject: &SubjectRef, note: &str) {
    workflow.request_reject(subject).await.unwrap();
    workflow.edit_staged_note(subject, note).await.unwrap();
    workflow.confirm(subject).await.unwrap();
}
