use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::domain::{
    error::PublishError,
    models::event::{BatchResponse, EventEnvelope},
    services::event_publisher::{EventPublisher, MessageId},
};

/// One delivery attempt of an envelope, counting from 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub envelope: EventEnvelope,
    pub attempt: u32,
}

impl Delivery {
    fn first(envelope: EventEnvelope) -> Self {
        Self {
            envelope,
            attempt: 1,
        }
    }
}

/// Publishing side of a single in-process topic
#[derive(Clone)]
pub struct InMemoryEventBus {
    topic: String,
    sender: UnboundedSender<EventEnvelope>,
}

/// Receiving side of the topic. Delivers at least once: failed deliveries are
/// queued again until `max_deliveries` attempts, then dead-lettered.
pub struct Subscription {
    topic: String,
    receiver: UnboundedReceiver<EventEnvelope>,
    pending: VecDeque<Delivery>,
    dead_letters: Vec<Delivery>,
    max_deliveries: u32,
}

impl InMemoryEventBus {
    pub fn channel(topic: impl Into<String>, max_deliveries: u32) -> (Self, Subscription) {
        let topic = topic.into();
        let (sender, receiver) = mpsc::unbounded_channel();

        let bus = Self {
            topic: topic.clone(),
            sender,
        };
        let subscription = Subscription {
            topic,
            receiver,
            pending: VecDeque::new(),
            dead_letters: Vec::new(),
            max_deliveries: max_deliveries.max(1),
        };
        (bus, subscription)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, message: &str) -> Result<MessageId, PublishError> {
        if topic != self.topic {
            return Err(PublishError::UnknownTopic(topic.to_string()));
        }

        let message_id = Uuid::new_v4().to_string();
        self.sender
            .send(EventEnvelope::new(message_id.clone(), message))
            .map_err(|_| PublishError::Transport("subscription closed".to_string()))?;

        tracing::debug!(topic, message_id = %message_id, "Published event");
        Ok(message_id)
    }
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn dead_letters(&self) -> &[Delivery] {
        &self.dead_letters
    }

    /// Wait for up to `max_size` deliveries, redeliveries first.
    ///
    /// Returns `None` once every publisher is dropped and nothing is left to deliver.
    pub async fn next_batch(&mut self, max_size: usize) -> Option<Vec<Delivery>> {
        let max_size = max_size.max(1);
        let mut batch = Vec::with_capacity(max_size);

        while batch.len() < max_size {
            match self.pending.pop_front() {
                Some(delivery) => batch.push(delivery),
                None => break,
            }
        }

        if batch.is_empty() {
            let envelope = self.receiver.recv().await?;
            batch.push(Delivery::first(envelope));
        }

        while batch.len() < max_size {
            match self.receiver.try_recv() {
                Ok(envelope) => batch.push(Delivery::first(envelope)),
                Err(_) => break,
            }
        }

        Some(batch)
    }

    /// Settle a processed batch; only the deliveries the report lists as failed come back.
    pub fn settle(&mut self, batch: Vec<Delivery>, report: &BatchResponse) {
        for delivery in batch {
            if !report.is_failed(&delivery.envelope.message_id) {
                continue;
            }

            if delivery.attempt >= self.max_deliveries {
                tracing::error!(
                    topic = %self.topic,
                    message_id = %delivery.envelope.message_id,
                    attempts = delivery.attempt,
                    "Dead-lettering message after final delivery attempt"
                );
                self.dead_letters.push(delivery);
            } else {
                tracing::warn!(
                    topic = %self.topic,
                    message_id = %delivery.envelope.message_id,
                    attempt = delivery.attempt,
                    "Redelivering failed message"
                );
                self.pending.push_back(Delivery {
                    attempt: delivery.attempt + 1,
                    ..delivery
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::BatchItemFailure;

    const TOPIC: &str = "user-registration";

    fn failure_report(message_id: &str) -> BatchResponse {
        BatchResponse {
            batch_item_failures: vec![BatchItemFailure {
                item_identifier: message_id.to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_publish_delivers_payload() {
        let (bus, mut subscription) = InMemoryEventBus::channel(TOPIC, 3);

        let message_id = bus.publish(TOPIC, r#"{"a":1}"#).await.unwrap();
        let batch = subscription.next_batch(10).await.unwrap();

        assert_eq!(
            batch,
            vec![Delivery {
                envelope: EventEnvelope::new(message_id, r#"{"a":1}"#),
                attempt: 1,
            }]
        );
    }

    #[tokio::test]
    async fn test_publish_to_unknown_topic_negative() {
        let (bus, _subscription) = InMemoryEventBus::channel(TOPIC, 3);

        let result = bus.publish("other-topic", "{}").await;

        assert!(matches!(result, Err(PublishError::UnknownTopic(topic)) if topic == "other-topic"));
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_negative() {
        let (bus, subscription) = InMemoryEventBus::channel(TOPIC, 3);
        drop(subscription);

        let result = bus.publish(TOPIC, "{}").await;

        assert!(matches!(result, Err(PublishError::Transport(_))));
    }

    #[tokio::test]
    async fn test_next_batch_respects_max_size() {
        let (bus, mut subscription) = InMemoryEventBus::channel(TOPIC, 3);
        for i in 0..5 {
            bus.publish(TOPIC, &i.to_string()).await.unwrap();
        }
        drop(bus);

        let sizes = [
            subscription.next_batch(2).await.map(|b| b.len()),
            subscription.next_batch(2).await.map(|b| b.len()),
            subscription.next_batch(2).await.map(|b| b.len()),
            subscription.next_batch(2).await.map(|b| b.len()),
        ];

        assert_eq!(sizes, [Some(2), Some(2), Some(1), None]);
    }

    #[tokio::test]
    async fn test_settle_redelivers_only_failed_subset() {
        let (bus, mut subscription) = InMemoryEventBus::channel(TOPIC, 3);
        let ok_id = bus.publish(TOPIC, "ok").await.unwrap();
        let failed_id = bus.publish(TOPIC, "failed").await.unwrap();
        drop(bus);

        let batch = subscription.next_batch(10).await.unwrap();
        subscription.settle(batch, &failure_report(&failed_id));

        let redelivered = subscription.next_batch(10).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].envelope.message_id, failed_id);
        assert_eq!(redelivered[0].attempt, 2);
        assert_ne!(redelivered[0].envelope.message_id, ok_id);
    }

    #[tokio::test]
    async fn test_settle_dead_letters_after_max_deliveries() {
        let (bus, mut subscription) = InMemoryEventBus::channel(TOPIC, 2);
        let message_id = bus.publish(TOPIC, "failed").await.unwrap();
        drop(bus);
        let failed = failure_report(&message_id);

        let batch = subscription.next_batch(10).await.unwrap();
        subscription.settle(batch, &failed);
        let batch = subscription.next_batch(10).await.unwrap();
        subscription.settle(batch, &failed);

        assert!(subscription.next_batch(10).await.is_none());
        assert_eq!(subscription.dead_letters().len(), 1);
        assert_eq!(subscription.dead_letters()[0].envelope.message_id, message_id);
        assert_eq!(subscription.dead_letters()[0].attempt, 2);
    }
}
