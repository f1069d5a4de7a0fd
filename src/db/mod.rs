mod pool;
mod unit_of_work;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pool::create_pool;
pub use unit_of_work::with_transaction;
