pub mod daily_entry;
pub mod task;
pub mod user;
