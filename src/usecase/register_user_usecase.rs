use serde_json::Value;

use crate::domain::{
    error::{PublishError, RegistrationError},
    models::{event::Accepted, registration::validate_registration},
    services::event_publisher::EventPublisher,
};

pub struct RegisterUserUsecase<P: EventPublisher> {
    publisher: P,
    topic: Option<String>,
}

impl<P: EventPublisher> RegisterUserUsecase<P> {
    pub fn new(publisher: P, topic: Option<String>) -> Self {
        Self { publisher, topic }
    }

    /// Validate a registration request and publish it as an event.
    ///
    /// Returns as soon as the transport accepts the event; the user record is
    /// created later by the consumer.
    pub async fn publish_registration(&self, raw: &Value) -> Result<Accepted, RegistrationError> {
        let request = validate_registration(raw).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected user registration request");
        })?;

        let topic = self
            .topic
            .as_deref()
            .ok_or(PublishError::TopicNotConfigured)?;
        let message =
            serde_json::to_string(&request).map_err(|e| PublishError::Transport(e.to_string()))?;

        let message_id = self.publisher.publish(topic, &message).await?;

        tracing::info!(topic, message_id = %message_id, "Accepted user registration request");
        Ok(Accepted { message_id })
    }
}
