//! SQLite backend for the WOB ZZ warehouse.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The `DIM`/`FCT` schema split of the
//! warehouse is flattened into table-name prefixes (`DIM_DAG`).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
