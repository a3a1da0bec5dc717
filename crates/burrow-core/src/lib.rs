//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the record store contract, the shortener service
//! contract, and the shared short code and error types used by the storage
//! backends, the services, and the transports.

pub mod base58;
pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;
pub mod subnet;

pub use error::{ShortenerError, StorageError};
pub use repository::{OwnedUrl, Repository, ResolvedUrl, SaveOutcome, UrlRecord};
pub use shortcode::ShortCode;
pub use shortener::{BatchItem, BatchResult, Shortener, Stats};
pub use subnet::TrustedSubnet;
