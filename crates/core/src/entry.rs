//! Cache entry states and their stored encoding.
//!
//! Stored values are tagged documents (`{"state":"pending"}` or
//! `{"state":"populated","data":...}`), so an in-flight marker can never be
//! mistaken for payload data. `Absent` is never stored: it is what a
//! missing or expired key reads as.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;

/// State of one cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry<T> {
    Absent,
    /// A fetch job has been dispatched for this key.
    Pending,
    Populated(T),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
enum Stored<T> {
    Pending,
    Populated(T),
}

impl<T: DeserializeOwned> CacheEntry<T> {
    /// Decode a raw store value read under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheDecode` if the value is not a valid entry.
    pub fn decode(key: &str, raw: Option<&[u8]>) -> Result<Self, Error> {
        let Some(bytes) = raw else {
            return Ok(CacheEntry::Absent);
        };

        match serde_json::from_slice::<Stored<T>>(bytes) {
            Ok(Stored::Pending) => Ok(CacheEntry::Pending),
            Ok(Stored::Populated(value)) => Ok(CacheEntry::Populated(value)),
            Err(e) => Err(Error::CacheDecode { key: key.to_string(), reason: e.to_string() }),
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheEntry::Pending)
    }

    pub fn populated(self) -> Option<T> {
        match self {
            CacheEntry::Populated(value) => Some(value),
            _ => None,
        }
    }
}

/// Stored form of the in-flight marker.
pub fn encode_pending() -> Vec<u8> {
    // A unit variant always serializes.
    serde_json::to_vec(&Stored::<()>::Pending).unwrap_or_else(|_| br#"{"state":"pending"}"#.to_vec())
}

/// Stored form of populated data.
///
/// # Errors
///
/// Returns `Error::CacheEncode` if `value` cannot be serialized.
pub fn encode_populated<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(&Stored::Populated(value))
        .map_err(|e| Error::CacheEncode { key: key.to_string(), reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ValidatedRecord;

    #[test]
    fn test_missing_value_is_absent() {
        let entry = CacheEntry::<ValidatedRecord>::decode("k", None).unwrap();
        assert_eq!(entry, CacheEntry::Absent);
    }

    #[test]
    fn test_pending_marker() {
        assert_eq!(encode_pending(), br#"{"state":"pending"}"#.to_vec());
        let entry = CacheEntry::<ValidatedRecord>::decode("k", Some(&encode_pending())).unwrap();
        assert!(entry.is_pending());
    }

    #[test]
    fn test_populated_payload() {
        let record = ValidatedRecord { title: Some("in job queue".into()), ..Default::default() };
        let bytes = encode_populated("k", &record).unwrap();

        let entry = CacheEntry::<ValidatedRecord>::decode("k", Some(&bytes)).unwrap();
        assert_eq!(entry.populated(), Some(record));
    }

    #[test]
    fn test_payload_resembling_marker_is_data() {
        let bytes = encode_populated("k", &"pending".to_string()).unwrap();
        let entry = CacheEntry::<String>::decode("k", Some(&bytes)).unwrap();
        assert_eq!(entry, CacheEntry::Populated("pending".to_string()));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = CacheEntry::<ValidatedRecord>::decode("embedly:x", Some(b"\\invalid json"));
        assert!(matches!(result, Err(Error::CacheDecode { key, .. }) if key == "embedly:x"));

        let result = CacheEntry::<ValidatedRecord>::decode("k", Some(br#""in job queue""#));
        assert!(matches!(result, Err(Error::CacheDecode { .. })));
    }
}
