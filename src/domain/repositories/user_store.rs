use async_trait::async_trait;

use crate::domain::{
    error::StorageError,
    models::user::{UserId, UserRecord},
};

/// Durable storage of user records keyed by id
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Bind `candidate` to a transport message unless the message already has an id.
    ///
    /// Returns the id bound to the message, so every redelivery of it resolves
    /// to the id of its first delivery.
    async fn assign_id(&self, message_id: &str, candidate: UserId) -> Result<UserId, StorageError>;

    /// Upsert by id: writing the same record twice leaves exactly one record
    async fn create_user(&self, user: &UserRecord) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError>;
}
