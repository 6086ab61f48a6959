pub mod registration_subscriber;
