//! Loading into the WOB ZZ warehouse.
//!
//! Two steps use this crate. Staged dimension extracts are bulk loaded table
//! by table with [`load_staged_dimensions`]. Transaction files are then
//! streamed into the fact table by a [`SubtrajectLoader`], which resolves
//! every reference through in-memory dimension caches and creates dimension
//! rows for codes it has not seen.

mod buffer;
pub mod dimension;
pub mod error;
pub mod staged;
pub mod subtraject;

pub use buffer::DEFAULT_BULK_SIZE;
pub use dimension::{Attribute, BulkDimension, CachedDimension};
pub use error::{Error, Result};
pub use staged::{LoadedExtract, load_staged_dimensions};
pub use subtraject::{FileStats, Subtraject, SubtrajectLoader, open_input};
