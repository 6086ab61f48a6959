use serde::{Deserialize, Serialize};

use crate::domain::models::user::UserId;

/// Transport wrapper around a published registration event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    pub message_id: String,
    pub payload: String,
}

impl EventEnvelope {
    pub fn new(message_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            payload: payload.into(),
        }
    }
}

/// Acknowledgment returned once a registration event is handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Created(UserId),
    /// Permanent: redelivery cannot succeed
    ValidationFailed(String),
    /// Transient: redelivery may succeed
    StorageFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub message_id: String,
    pub status: MessageStatus,
}

impl MessageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, MessageStatus::Created(_))
    }
}

/// Per-message outcomes of one batch, in delivery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub outcomes: Vec<MessageOutcome>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Reduce to the partial batch failure report the transport expects
    pub fn into_response(self) -> BatchResponse {
        let batch_item_failures = self
            .outcomes
            .into_iter()
            .filter(|o| !o.is_success())
            .map(|o| BatchItemFailure {
                item_identifier: o.message_id,
            })
            .collect();
        BatchResponse {
            batch_item_failures,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl BatchResponse {
    pub fn is_failed(&self, message_id: &str) -> bool {
        self.batch_item_failures
            .iter()
            .any(|f| f.item_identifier == message_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}
