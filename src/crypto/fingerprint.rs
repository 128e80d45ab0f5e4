// Content fingerprints for registry snapshots.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// Domain separation so a snapshot digest never collides with a digest of a single document.
const SNAPSHOT_DOMAIN: &[u8] = b"ERPGW-SNAPSHOT";

/// Sorts a JSON object's keys recursively.
/// This is essential for canonical serialization.
fn sort_json_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted_map: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_json_value(v)))
                .collect();
            Value::Object(sorted_map.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_json_value).collect()),
        _ => value.clone(),
    }
}

/// Canonical (sorted-key, compact) JSON rendering of any serializable value.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&sort_json_value(&value))
}

/// Hex SHA-256 over the canonical JSON of `items`, in the order given.
///
/// Callers pass items in a stable order (the registry sorts by id) so equal
/// content always yields an equal fingerprint.
pub fn fingerprint<'a, T, I>(items: I) -> Result<String, serde_json::Error>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut hasher = Sha256::new();
    hasher.update(SNAPSHOT_DOMAIN);
    for item in items {
        let canonical = canonical_json(item)?;
        hasher.update((canonical.len() as u64).to_be_bytes());
        hasher.update(canonical.as_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_fingerprint() {
        let a = json!({"id": "A", "nested": {"x": 1, "y": 2}});
        let b = json!({"nested": {"y": 2, "x": 1}, "id": "A"});
        assert_eq!(fingerprint([&a]).unwrap(), fingerprint([&b]).unwrap());
    }

    #[test]
    fn content_change_changes_fingerprint() {
        let a = json!({"id": "A"});
        let b = json!({"id": "B"});
        assert_ne!(fingerprint([&a]).unwrap(), fingerprint([&b]).unwrap());
        assert_ne!(fingerprint([&a, &b]).unwrap(), fingerprint([&b, &a]).unwrap());
    }

    #[test]
    fn empty_snapshot_has_stable_fingerprint() {
        let none: Vec<Value> = Vec::new();
        assert_eq!(fingerprint(&none).unwrap(), fingerprint(&none).unwrap());
        assert_eq!(fingerprint(&none).unwrap().len(), 64);
    }
}
