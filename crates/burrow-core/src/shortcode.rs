use crate::base58::{ShortCodeBase58, MAX_ENCODED_LEN};
use crate::error::ShortenerError;
use std::fmt::Display;

/// The path segment that identifies a short URL.
///
/// Every code is a base58 rendering of the generator's random bytes, so
/// anything else arriving from a caller cannot name a stored record and is
/// refused before it reaches a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortCode(ShortCodeBase58);

impl ShortCode {
    /// Parses a code received from a caller.
    pub fn parse(raw: &str) -> Result<Self, ShortenerError> {
        ShortCodeBase58::parse(raw).map(Self).ok_or_else(|| {
            ShortenerError::InvalidShortCode(format!(
                "expected up to {MAX_ENCODED_LEN} base58 characters, got '{raw}'"
            ))
        })
    }

    /// Joins the code onto `base_url`, tolerating a trailing slash.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<ShortCodeBase58> for ShortCode {
    fn from(code: ShortCodeBase58) -> Self {
        Self(code)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base58::CODE_BYTES;

    #[test]
    fn issued_codes_parse_back() {
        let issued = ShortCode::from(ShortCodeBase58::new([7u8; CODE_BYTES]));
        let parsed = ShortCode::parse(issued.as_str()).unwrap();
        assert_eq!(parsed, issued);
    }

    #[test]
    fn refuses_what_was_never_issued() {
        assert!(ShortCode::parse("").is_err());
        assert!(ShortCode::parse("no!pe").is_err());
        assert!(ShortCode::parse("abc-def").is_err());
        assert!(ShortCode::parse("O0Il").is_err());
        assert!(ShortCode::parse("zzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn error_names_the_input() {
        let err = ShortCode::parse("abc/def").unwrap_err();
        assert!(matches!(err, ShortenerError::InvalidShortCode(ref msg) if msg.contains("abc/def")));
    }

    #[test]
    fn to_url_joins_base() {
        let code = ShortCode::parse("3mJr7A").unwrap();
        assert_eq!(code.to_url("http://localhost:8080"), "http://localhost:8080/3mJr7A");
        assert_eq!(code.to_url("http://localhost:8080/"), "http://localhost:8080/3mJr7A");
    }
}
