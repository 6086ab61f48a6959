use uuid::Uuid;

use crate::domain::{models::user::UserId, services::id_generator::IdGenerator};

/// Random (v4) UUID identifiers
#[derive(Clone)]
pub struct UuidIdGenerator;

impl UuidIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UuidIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> UserId {
        UserId::from_uuid(Uuid::new_v4())
    }
}
