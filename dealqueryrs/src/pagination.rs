//! Cursor-based pagination utilities.
//!
//! Cursors are stateless: a URL-safe base64 JSON blob carrying the next row
//! offset and a hash of the request it was issued for.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, DealQueryError, Result};

/// Parameter keys that steer paging rather than define the query.
pub const PAGINATION_KEYS: [&str; 2] = ["offset", "cursor"];

/// LIMIT/OFFSET cursor for the next page of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Row offset for next page
    pub offset: u64,
    /// Hash of the request parameters the cursor belongs to
    pub query_hash: u64,
}

impl Cursor {
    pub fn new(offset: u64, query_hash: u64) -> Self {
        Self { offset, query_hash }
    }

    /// Encode cursor to a URL-safe base64 string.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| DealQueryError::Execution(format!("failed to serialize cursor: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }

    /// Decode cursor from a base64 string.
    pub fn decode(encoded: &str) -> std::result::Result<Self, BuildError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| BuildError::InvalidCursor(format!("bad encoding: {e}")))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| BuildError::InvalidCursor(format!("bad UTF-8: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| BuildError::InvalidCursor(format!("bad format: {e}")))
    }

    /// Validate that this cursor was issued for a request with the given hash.
    pub fn validate_query_hash(&self, expected_hash: u64) -> std::result::Result<(), BuildError> {
        if self.query_hash != expected_hash {
            return Err(BuildError::InvalidCursor(
                "cursor does not match current query - the query parameters may have changed"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Hash of the request parameters that define the query.
///
/// Keys are hashed in sorted order so parameter order does not matter;
/// `offset` and `cursor` are excluded, `limit` is included since it caps
/// the result.
pub fn compute_query_hash(params: &BTreeMap<String, String>) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (key, value) in params {
        if PAGINATION_KEYS.contains(&key.as_str()) {
            continue;
        }
        key.hash(&mut hasher);
        value.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = Cursor::new(100, 12345678);
        let encoded = cursor.encode().unwrap();
        assert_eq!(Cursor::decode(&encoded).unwrap(), cursor);
    }

    #[test]
    fn test_invalid_cursor_rejected() {
        let err = Cursor::decode("not-valid-base64!!!").unwrap_err();
        assert!(matches!(err, BuildError::InvalidCursor(_)));

        let result = Cursor::decode(&URL_SAFE_NO_PAD.encode(b"not json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_query_hash_validation() {
        let cursor = Cursor::new(100, 12345);
        assert!(cursor.validate_query_hash(12345).is_ok());
        assert!(cursor.validate_query_hash(99999).is_err());
    }

    #[test]
    fn test_query_hash_ignores_pagination_keys() {
        let first = params(&[("type", "2"), ("limit", "10")]);
        let second = params(&[("type", "2"), ("limit", "10"), ("offset", "20")]);
        assert_eq!(compute_query_hash(&first), compute_query_hash(&second));
    }

    #[test]
    fn test_query_hash_different_queries() {
        let first = params(&[("type", "2"), ("limit", "10")]);
        let other_type = params(&[("type", "14"), ("limit", "10")]);
        let other_limit = params(&[("type", "2"), ("limit", "20")]);
        assert_ne!(compute_query_hash(&first), compute_query_hash(&other_type));
        assert_ne!(compute_query_hash(&first), compute_query_hash(&other_limit));
    }
}
