//! Record store backends for Burrow.
//!
//! Three implementations of [`burrow_core::Repository`]: an append-only
//! JSON-lines file, a Postgres table, and a process-local map.

pub mod backend;
pub mod log;
pub mod memory;
pub mod postgres;

pub use backend::Backend;
pub use burrow_core::error::{Result, StorageError};
pub use burrow_core::repository::{OwnedUrl, Repository, ResolvedUrl, SaveOutcome, UrlRecord};
pub use log::LogRepository;
pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
