use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Input is not an object")]
    NotAnObject,

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Rejected input: {0}")]
    Rejected(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Rejected(errors.to_string())
    }
}

/// Message payload could not be read as JSON
#[derive(Debug, Error)]
#[error("Payload is not valid JSON: {0}")]
pub struct ParseError(pub String);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Registration topic is not configured")]
    TopicNotConfigured,

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Users table is not configured")]
    TableNotConfigured,

    #[error("Database error: {0}")]
    Database(String),
}

/// Failure of a registration request at submission time
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Failure of a single consumed registration event
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ProcessingError {
    /// Redelivering the same payload can never succeed.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
