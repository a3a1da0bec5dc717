//! Short code and record id generation.

pub mod random;

use burrow_core::ShortCode;

pub use random::RandomGenerator;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;
    /// Generates a value that can be converted into a short code.
    ///
    /// Codes must be unguessable; collisions are expected to be negligible
    /// rather than impossible.
    fn generate(&self) -> Self::Output;
}

/// Returns a fresh opaque record id.
///
/// Ids are random UUIDv4 strings, so no state is shared between callers.
pub fn record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Returns a fresh owner identity for callers that arrive without one.
pub fn owner_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
