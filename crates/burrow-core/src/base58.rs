use std::fmt::Display;

/// Random bytes behind every issued short code.
pub const CODE_BYTES: usize = 8;

/// Longest base58 rendering of [`CODE_BYTES`] bytes.
pub const MAX_ENCODED_LEN: usize = 11;

/// A short code encoded as base58 string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShortCodeBase58(String);

impl ShortCodeBase58 {
    /// Creates a new `ShortCodeBase58` by encoding the given bytes as base58.
    ///
    /// # Examples
    ///
    /// ```
    /// use burrow_core::base58::ShortCodeBase58;
    ///
    /// let code = ShortCodeBase58::new([0x10, 0x20, 0x30]);
    /// assert!(!code.as_str().is_empty());
    /// ```
    pub fn new<T: AsRef<[u8]>>(bytes: T) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    /// Accepts a string only if it could have been issued: base58 alphabet,
    /// decoding to at most [`CODE_BYTES`] bytes.
    pub fn parse(encoded: &str) -> Option<Self> {
        if encoded.is_empty() || encoded.len() > MAX_ENCODED_LEN {
            return None;
        }
        let decoded = bs58::decode(encoded).into_vec().ok()?;
        if decoded.len() > CODE_BYTES {
            return None;
        }
        Some(Self(encoded.to_owned()))
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ShortCodeBase58 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCodeBase58").field(&self.0).finish()
    }
}

impl Display for ShortCodeBase58 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
