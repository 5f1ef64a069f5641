use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Length of the all-zero sentinel used as the genesis parent pointer
const SENTINEL_LEN: usize = 64;

/// Errors that can occur while parsing a hash
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("Invalid hash: empty string")]
    Empty,

    #[error("Invalid hash: character {character:?} at position {position} is not hexadecimal")]
    InvalidCharacter { character: char, position: usize },
}

/// A validated hexadecimal identifier used for block digests and parent pointers.
///
/// The string is kept verbatim: `"ABC123"` and `"abc123"` are distinct values.
/// Ordering is character-wise on the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashValue(String);

impl HashValue {
    /// Parses a hash, rejecting empty input and anything outside `[0-9a-fA-F]`
    pub fn parse(s: &str) -> Result<Self, HashError> {
        if s.is_empty() {
            return Err(HashError::Empty);
        }

        if let Some((position, character)) = s
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(HashError::InvalidCharacter { character, position });
        }

        Ok(HashValue(s.to_string()))
    }

    /// Lowercase hex rendering of raw digest bytes; always valid
    pub(crate) fn from_digest(bytes: &[u8]) -> Self {
        HashValue(hex::encode(bytes))
    }

    /// The parent pointer carried by the genesis block
    pub fn sentinel() -> Self {
        HashValue("0".repeat(SENTINEL_LEN))
    }

    /// Whether this is the genesis parent sentinel
    pub fn is_sentinel(&self) -> bool {
        self.0.len() == SENTINEL_LEN && self.0.bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HashValue {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashValue::parse(s)
    }
}

impl TryFrom<String> for HashValue {
    type Error = HashError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        HashValue::parse(&s)
    }
}

impl From<HashValue> for String {
    fn from(hash: HashValue) -> Self {
        hash.0
    }
}

impl AsRef<str> for HashValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_hex() {
        assert_eq!(HashValue::parse("abc123").unwrap().as_str(), "abc123");
        assert_eq!(HashValue::parse("ABC123").unwrap().as_str(), "ABC123");
        assert_eq!(HashValue::parse("0").unwrap().as_str(), "0");
    }

    #[test]
    fn test_parse_invalid_hex() {
        assert_eq!(
            HashValue::parse("xyz123"),
            Err(HashError::InvalidCharacter { character: 'x', position: 0 })
        );
        assert_eq!(HashValue::parse(""), Err(HashError::Empty));
        assert!(HashValue::parse("abc 123").is_err());
        assert!(HashValue::parse("0x1f").is_err());
    }

    #[test]
    fn test_case_is_preserved() {
        let upper = HashValue::parse("ABC123").unwrap();
        let lower = HashValue::parse("abc123").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(upper.to_string(), "ABC123");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = HashValue::parse("0a").unwrap();
        let b = HashValue::parse("0b").unwrap();
        let c = HashValue::parse("1").unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_sentinel() {
        let sentinel = HashValue::sentinel();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.as_str().len(), 64);
        assert!(!HashValue::parse("00").unwrap().is_sentinel());
    }

    #[test]
    fn test_serde_validates() {
        let hash: HashValue = serde_json::from_str("\"deadBEEF\"").unwrap();
        assert_eq!(hash.as_str(), "deadBEEF");
        assert_eq!(serde_json::to_string(&hash).unwrap(), "\"deadBEEF\"");

        assert!(serde_json::from_str::<HashValue>("\"nothex\"").is_err());
        assert!(serde_json::from_str::<HashValue>("\"\"").is_err());
    }
}
