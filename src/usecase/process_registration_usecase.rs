use futures::future::join_all;
use serde_json::Value;

use crate::domain::{
    error::{ParseError, ProcessingError},
    models::{
        event::{BatchResult, EventEnvelope, MessageOutcome, MessageStatus},
        registration::validate_registration,
        user::UserRecord,
    },
    repositories::user_store::UserStore,
    services::id_generator::IdGenerator,
};

/// Consumes published registration events and creates user records
pub struct ProcessRegistrationUsecase<S: UserStore, G: IdGenerator> {
    user_store: S,
    id_generator: G,
}

impl<S: UserStore, G: IdGenerator> ProcessRegistrationUsecase<S, G> {
    pub fn new(user_store: S, id_generator: G) -> Self {
        Self {
            user_store,
            id_generator,
        }
    }

    /// Process every message of a batch concurrently.
    ///
    /// A failing message never stops its siblings; the result lists one outcome
    /// per message, in input order.
    pub async fn process_batch(&self, messages: &[EventEnvelope]) -> BatchResult {
        tracing::info!(
            batch_size = messages.len(),
            "Received user registration requests"
        );

        let outcomes = join_all(messages.iter().map(|m| self.process_message(m))).await;
        let result = BatchResult { outcomes };

        tracing::info!(
            batch_size = result.outcomes.len(),
            succeeded = result.succeeded(),
            failed = result.failed(),
            "Processed user registration requests"
        );
        result
    }

    async fn process_message(&self, envelope: &EventEnvelope) -> MessageOutcome {
        let status = match self.create_user(envelope).await {
            Ok(user) => {
                tracing::info!(
                    id = %user.id(),
                    name = user.name(),
                    email = user.email(),
                    "Created user"
                );
                MessageStatus::Created(user.id().clone())
            }
            Err(e) if e.is_permanent() => {
                tracing::warn!(
                    message_id = %envelope.message_id,
                    failure = "permanent",
                    error = %e,
                    "Rejected user registration event"
                );
                MessageStatus::ValidationFailed(e.to_string())
            }
            Err(e) => {
                tracing::error!(
                    message_id = %envelope.message_id,
                    failure = "transient",
                    error = %e,
                    "Failed to store user"
                );
                MessageStatus::StorageFailed(e.to_string())
            }
        };

        MessageOutcome {
            message_id: envelope.message_id.clone(),
            status,
        }
    }

    async fn create_user(&self, envelope: &EventEnvelope) -> Result<UserRecord, ProcessingError> {
        let raw: Value =
            serde_json::from_str(&envelope.payload).map_err(|e| ParseError(e.to_string()))?;
        let request = validate_registration(&raw)?;

        // a redelivered message reuses the id of its first delivery
        let id = self
            .user_store
            .assign_id(&envelope.message_id, self.id_generator.generate())
            .await?;
        let user = UserRecord::create(id, request);
        self.user_store.create_user(&user).await?;

        Ok(user)
    }
}
