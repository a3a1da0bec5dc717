//! URL shortener service implementation.
//!
//! This crate provides [`ShortenerService`], the creation and resolution
//! logic on top of a [`burrow_core::Repository`], and the batch deletion
//! pipeline it schedules. Core types are re-exported from `burrow_core`.

pub mod deletion;
pub mod service;
pub mod signal;

pub use burrow_core::{Shortener, ShortenerError};
pub use deletion::{DeletionReport, DELETE_WORKERS};
pub use service::ShortenerService;
pub use signal::shutdown_signal;
