pub mod event_publisher;
pub mod id_generator;
