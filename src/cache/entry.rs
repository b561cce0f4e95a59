//! Serialized cache entry with an absolute expiry timestamp

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use super::StoreError;

/// A cached value together with the instant it goes stale
///
/// Stored as `{"data": ..., "expiry": <ms since epoch>}`. The entry is valid
/// strictly before `expiry`; at or after it the entry counts as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Milliseconds since the Unix epoch after which the entry is stale
    pub expiry: i64,
}

impl<T> CacheEntry<T> {
    /// Creates an entry that expires `ttl` after `now_ms`
    pub fn new(data: T, now_ms: i64, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            data,
            expiry: now_ms.saturating_add(ttl_ms),
        }
    }

    /// Returns true if the entry may still be served at `now_ms`
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expiry
    }
}

impl<T: Serialize> CacheEntry<T> {
    /// Serializes the entry to the JSON string handed to the store
    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> CacheEntry<T> {
    /// Parses a stored string, returning `None` if it is not a valid entry
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed cache entry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_new_sets_expiry_from_ttl() {
        let entry = CacheEntry::new("job", 1_000, Duration::from_millis(5_000));
        assert_eq!(entry.expiry, 6_000);
    }

    #[test]
    fn test_entry_is_stale_at_exact_expiry() {
        let entry = CacheEntry::new(1, 0, Duration::from_millis(100));
        assert!(entry.is_fresh(99));
        assert!(!entry.is_fresh(100));
        assert!(!entry.is_fresh(101));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let entry = CacheEntry::new(1, 500, Duration::ZERO);
        assert!(!entry.is_fresh(500));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new(1, 10, Duration::from_secs(u64::MAX));
        assert_eq!(entry.expiry, i64::MAX);
    }

    #[test]
    fn test_encode_uses_data_and_expiry_fields() {
        let entry = CacheEntry::new(json!({"id": 1}), 0, Duration::from_millis(42));
        let raw = entry.encode().expect("encode should succeed");
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"data": {"id": 1}, "expiry": 42}));
    }

    #[test]
    fn test_decode_preserves_nested_json() {
        let payload = json!({"title": "Rust Engineer", "tags": ["remote", null, 3.5]});
        let raw = CacheEntry::new(payload.clone(), 0, Duration::from_secs(1))
            .encode()
            .unwrap();
        let decoded: CacheEntry<Value> = CacheEntry::decode(&raw).expect("should decode");
        assert_eq!(decoded.data, payload);
    }

    #[test]
    fn test_floats_survive_encode_decode_exactly() {
        let floats = [
            1.0715660391465826e-75,
            0.1 + 0.2,
            f64::MIN_POSITIVE,
            5e-324,
            f64::MAX,
            -2.2250738585072014e-308,
            9007199254740992.0,
            1.7976931348623157e308,
            123456.78901234567,
        ];

        let raw = CacheEntry::new(floats.to_vec(), 0, Duration::from_secs(1))
            .encode()
            .unwrap();
        let decoded: CacheEntry<Vec<f64>> = CacheEntry::decode(&raw).expect("should decode");
        assert_eq!(decoded.data.len(), floats.len());

        for (expected, actual) in floats.iter().zip(&decoded.data) {
            assert_eq!(expected.to_bits(), actual.to_bits(), "{} came back as {}", expected, actual);
        }

        let value: CacheEntry<Value> = CacheEntry::decode(&raw).unwrap();
        assert_eq!(value.data[0].as_f64().unwrap().to_bits(), floats[0].to_bits());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(CacheEntry::<Value>::decode("not json").is_none());
        assert!(CacheEntry::<Value>::decode("{\"data\": 1}").is_none());
        assert!(CacheEntry::<Value>::decode("{\"data\": 1, \"expiry\": \"soon\"}").is_none());
    }

    #[test]
    fn test_decode_rejects_wrong_payload_shape() {
        let raw = CacheEntry::new("text", 0, Duration::from_secs(1)).encode().unwrap();
        assert!(CacheEntry::<u32>::decode(&raw).is_none());
    }
}
