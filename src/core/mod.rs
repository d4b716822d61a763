/// Core Module for surql-orm
///
/// Shared infrastructure for the rest of the crate: the crate-wide error
/// type and Result alias. Everything else (types, columns, the statement
/// builder, records, the execution runtime) builds on top of this module.

pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SurqlError};
