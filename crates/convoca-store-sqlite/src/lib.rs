//! SQLite backend for the Convoca hiring pipeline.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Each operation of
//! [`convoca_core::store::PipelineStore`] is one `BEGIN IMMEDIATE`
//! transaction.

mod encode;
mod queries;
mod retry;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
