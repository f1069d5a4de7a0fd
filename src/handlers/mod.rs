pub mod auth;
pub mod daily_entry;
pub mod health;
pub mod statistics;
pub mod taskboard;
pub mod tasks;
