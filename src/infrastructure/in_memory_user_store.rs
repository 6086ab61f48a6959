use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    error::StorageError,
    models::user::{UserId, UserRecord},
    repositories::user_store::UserStore,
};

/// Process-local store, used when no database is configured
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    assignments: Arc<RwLock<HashMap<String, UserId>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl InMemoryUserStore {
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn all(&self) -> Vec<UserRecord> {
        self.users.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn assign_id(&self, message_id: &str, candidate: UserId) -> Result<UserId, StorageError> {
        Ok(self
            .assignments
            .write()
            .await
            .entry(message_id.to_string())
            .or_insert(candidate)
            .clone())
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StorageError> {
        self.users
            .write()
            .await
            .insert(user.id().clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}
