//! Core types and trait definitions for the WOB ZZ warehouse ETL.
//!
//! This crate holds everything the staging, storage and loading crates share:
//! the field parsers, the reserved sentinel keys and dates, the destination
//! table catalog, the extract file format and the [`Warehouse`] backing-store
//! trait. It has no database dependency of its own.

pub mod error;
pub mod extract;
pub mod schema;
pub mod sentinel;
pub mod value;
pub mod warehouse;

pub use error::{Error, Result};
pub use sentinel::{Sentinel, SurrogateKey};
pub use warehouse::{Row, Warehouse};
