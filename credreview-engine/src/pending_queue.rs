//! Snapshot of lecturers awaiting review.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use credreview_core::LecturerId;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::commit::CommitListener;
use crate::registry::RegistryClient;

/// Locally cached list of pending lecturers.
///
/// Registered with the commit orchestrator so a committed lecturer leaves
/// the queue immediately, before the registry's own list catches up.
pub struct PendingQueue {
    registry: Arc<dyn RegistryClient>,
    lecturers: RwLock<Vec<LecturerId>>,
}

impl PendingQueue {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            lecturers: RwLock::new(Vec::new()),
        }
    }

    /// Replace the snapshot with the registry's current list.
    pub async fn refresh(&self) -> Result<usize> {
        let lecturers = self.registry.fetch_pending_lecturers().await?;
        let count = lecturers.len();
        *self.lecturers.write().await = lecturers;
        info!("Pending queue refreshed: {} lecturer(s)", count);
        Ok(count)
    }

    pub async fn snapshot(&self) -> Vec<LecturerId> {
        self.lecturers.read().await.clone()
    }

    pub async fn contains(&self, lecturer_id: &LecturerId) -> bool {
        self.lecturers.read().await.contains(lecturer_id)
    }

    /// Drop a lecturer from the snapshot. Returns whether it was present.
    pub async fn remove(&self, lecturer_id: &LecturerId) -> bool {
        let mut lecturers = self.lecturers.write().await;
        let before = lecturers.len();
        lecturers.retain(|id| id != lecturer_id);
        lecturers.len() != before
    }
}

#[async_trait]
impl CommitListener for PendingQueue {
    async fn on_lecturer_resolved(&self, lecturer_id: &LecturerId) {
        self.remove(lecturer_id).await;
        // A stale registry list must not bring the lecturer back
        match self.registry.fetch_pending_lecturers().await {
            Ok(mut lecturers) => {
                lecturers.retain(|id| id != lecturer_id);
                *self.lecturers.write().await = lecturers;
            }
            Err(e) => warn!(
                "Failed to refresh pending queue after resolving lecturer {}: {:#}",
                lecturer_id, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MutationAck;
    use anyhow::anyhow;
    use credreview_core::{LecturerSubmission, SubjectId};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Registry that only answers the pending-list query.
    struct PendingList {
        lecturers: Vec<&'static str>,
        unavailable: AtomicBool,
    }

    impl PendingList {
        fn new(lecturers: Vec<&'static str>) -> Self {
            Self {
                lecturers,
                unavailable: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl RegistryClient for PendingList {
        async fn fetch_lecturer_submission(&self, _: &LecturerId) -> Result<LecturerSubmission> {
            Err(anyhow!("not used"))
        }

        async fn fetch_pending_lecturers(&self) -> Result<Vec<LecturerId>> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(anyhow!("registry unavailable"));
            }
            Ok(self.lecturers.iter().map(|id| LecturerId::from(*id)).collect())
        }

        async fn approve_lecturer(&self, _: &LecturerId) -> Result<MutationAck> {
            Err(anyhow!("not used"))
        }

        async fn reject_lecturer(&self, _: &LecturerId, _: &str) -> Result<MutationAck> {
            Err(anyhow!("not used"))
        }

        async fn approve_degree(&self, _: &SubjectId) -> Result<MutationAck> {
            Err(anyhow!("not used"))
        }

        async fn reject_degree(&self, _: &SubjectId, _: &str) -> Result<MutationAck> {
            Err(anyhow!("not used"))
        }

        async fn approve_certification(&self, _: &SubjectId) -> Result<MutationAck> {
            Err(anyhow!("not used"))
        }

        async fn reject_certification(&self, _: &SubjectId, _: &str) -> Result<MutationAck> {
            Err(anyhow!("not used"))
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let queue = PendingQueue::new(Arc::new(PendingList::new(vec!["L1", "L2"])));
        assert!(queue.snapshot().await.is_empty());

        assert_eq!(queue.refresh().await.unwrap(), 2);
        assert_eq!(
            queue.snapshot().await,
            vec![LecturerId::from("L1"), LecturerId::from("L2")]
        );
    }

    #[tokio::test]
    async fn test_resolved_lecturer_stays_out_of_stale_list() {
        let queue = PendingQueue::new(Arc::new(PendingList::new(vec!["L1", "L2"])));
        queue.refresh().await.unwrap();

        queue.on_lecturer_resolved(&LecturerId::from("L1")).await;

        assert!(!queue.contains(&LecturerId::from("L1")).await);
        assert!(queue.contains(&LecturerId::from("L2")).await);
    }

    #[tokio::test]
    async fn test_resolution_survives_refresh_failure() {
        let registry = Arc::new(PendingList::new(vec!["L1", "L2"]));
        let queue = PendingQueue::new(registry.clone());
        queue.refresh().await.unwrap();

        registry.unavailable.store(true, Ordering::SeqCst);
        queue.on_lecturer_resolved(&LecturerId::from("L2")).await;

        assert_eq!(queue.snapshot().await, vec![LecturerId::from("L1")]);
        assert!(queue.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let queue = PendingQueue::new(Arc::new(PendingList::new(vec!["L1"])));
        queue.refresh().await.unwrap();
        assert!(queue.remove(&LecturerId::from("L1")).await);
        assert!(!queue.remove(&LecturerId::from("L1")).await);
    }
}
