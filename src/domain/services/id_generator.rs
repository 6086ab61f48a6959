use crate::domain::models::user::UserId;

/// Source of fresh user identifiers, independent of any user input
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> UserId;
}
