//! In-memory implementation of `DraftRepository`.
//!
//! All drafts are lost when the process exits. Used for tests and for
//! hosts that do not need drafts to survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DraftKey, DraftRecord, DraftRepository, RepositoryError};

/// In-memory draft repository.
pub struct InMemoryDraftRepository {
    groups: RwLock<HashMap<DraftKey, Vec<DraftRecord>>>,
}

impl InMemoryDraftRepository {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDraftRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn get(&self, key: &DraftKey) -> Result<Option<Vec<DraftRecord>>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.get(key).cloned())
    }

    async fn put(&self, key: &DraftKey, records: Vec<DraftRecord>) -> Result<(), RepositoryError> {
        let mut groups = self.groups.write().await;
        groups.insert(key.clone(), records);
        Ok(())
    }

    async fn delete(&self, key: &DraftKey) -> Result<bool, RepositoryError> {
        let mut groups = self.groups.write().await;
        Ok(groups.remove(key).is_some())
    }
}
