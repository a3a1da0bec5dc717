use crate::Generator;
use burrow_core::base58::ShortCodeBase58;
use burrow_core::ShortCode;
use rand::RngExt;

pub use burrow_core::base58::CODE_BYTES;

/// Generates short codes from [`CODE_BYTES`] bytes of the thread-local
/// CSPRNG, encoded as base58.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Draws the raw bytes of the next code.
    pub fn next_bytes(&self) -> [u8; CODE_BYTES] {
        let mut bytes = [0u8; CODE_BYTES];
        rand::rng().fill(&mut bytes);
        bytes
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        ShortCodeBase58::new(self.next_bytes()).into()
    }
}
