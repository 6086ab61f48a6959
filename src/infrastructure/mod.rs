pub mod in_memory_event_bus;
pub mod in_memory_user_store;
pub mod sea_orm_user_store;
pub mod uuid_id_generator;
