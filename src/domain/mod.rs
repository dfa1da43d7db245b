pub mod connection;
pub mod models;
pub mod response_selector;
pub mod slot_finder;
pub mod task_store;
