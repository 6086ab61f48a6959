use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::domain::error::ValidationError;

/// Validated registration input, as published on the registration topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(email)]
    email: String,

    #[validate(length(min = 2, max = 30))]
    name: String,
}

impl RegistrationRequest {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_parts(self) -> (String, String) {
        (self.email, self.name)
    }
}

/// Check untrusted input against the registration shape.
///
/// Unknown keys are dropped; the returned value carries only `email` and `name`.
pub fn validate_registration(raw: &Value) -> Result<RegistrationRequest, ValidationError> {
    if !raw.is_object() {
        return Err(ValidationError::NotAnObject);
    }

    let request = RegistrationRequest::deserialize(raw)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    request.validate()?;

    Ok(request)
}
