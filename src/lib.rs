// Core infrastructure modules
pub mod core;

// Schema building blocks
pub mod column;
pub mod query;
pub mod record;
pub mod types;

// Execution runtime, configuration and logging hooks
pub mod client;
pub mod config;
pub mod trace;

pub use crate::client::{Client, Envelope, HttpTransport, SqlOutcome, Transport};
pub use crate::column::{Column, Value};
pub use crate::config::{load_config, Config};
pub use crate::core::{Result, SurqlError};
pub use crate::query::Query;
pub use crate::record::{Key, Record, Schema};
pub use crate::types::{DbType, TypeKind};
