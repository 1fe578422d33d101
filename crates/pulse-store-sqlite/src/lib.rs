//! SQLite backend for the pulse durable sample queue.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Serialising every call onto that one
//! connection is also what makes drain-versus-append atomicity hold.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteQueue;
