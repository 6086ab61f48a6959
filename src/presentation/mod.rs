pub mod handlers;
pub mod subscribers;
