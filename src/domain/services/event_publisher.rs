use async_trait::async_trait;

use crate::domain::error::PublishError;

pub type MessageId = String;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand a serialized event to the transport, returning its message id
    async fn publish(&self, topic: &str, message: &str) -> Result<MessageId, PublishError>;
}
