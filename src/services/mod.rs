pub mod entry_composite;
pub mod statistics;
pub mod task_ordering;
pub mod week;
