use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{error::ValidationError, models::registration::RegistrationRequest};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }

    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_user_id(id: &UserId) -> Result<(), validator::ValidationError> {
    if id.as_str().trim().is_empty() {
        return Err(validator::ValidationError::new("empty_id"));
    }
    Ok(())
}

/// Persisted user, never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[validate(custom(function = "validate_user_id"))]
    id: UserId,

    #[validate(email)]
    email: String,

    #[validate(length(min = 2, max = 30))]
    name: String,

    created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Build a new record from a validated request, stamping the creation time
    pub fn create(id: UserId, request: RegistrationRequest) -> Self {
        let (email, name) = request.into_parts();
        Self {
            id,
            email,
            name,
            created_at: Utc::now(),
        }
    }

    #[cfg(test)]
    pub fn reconstruct(id: UserId, email: String, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            name,
            created_at,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }
    pub fn email(&self) -> &str {
        &self.email
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Check a value against the persisted user shape.
pub fn validate_user_record(raw: &Value) -> Result<UserRecord, ValidationError> {
    if !raw.is_object() {
        return Err(ValidationError::NotAnObject);
    }

    let record =
        UserRecord::deserialize(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    record.validate()?;

    Ok(record)
}
