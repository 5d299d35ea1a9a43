pub mod models;
pub mod reminders;
pub mod task_store;
