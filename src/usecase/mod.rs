pub mod process_registration_usecase;
pub mod register_user_usecase;
