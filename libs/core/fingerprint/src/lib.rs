//! Deterministic fingerprinting of generation requests.
//!
//! A fingerprint is a stable hash over a *canonicalized* JSON form of a
//! request: object keys sorted, string fields trimmed and whitespace
//! collapsed. Two requests that differ only in field order or incidental
//! whitespace hash identically; anything else collides only with
//! cryptographic negligibility (SHA-256).

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hashes any serializable request into a [`Fingerprint`] after
/// canonicalizing its JSON representation.
pub fn fingerprint_of<T: Serialize>(request: &T) -> Result<Fingerprint, serde_json::Error> {
    let value = serde_json::to_value(request)?;
    let canonical = canonicalize(&value);
    let bytes = serde_json::to_vec(&canonical).expect("canonicalized value always serializes");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(Fingerprint(out))
}

/// Recursively sorts object keys and normalizes string whitespace so that
/// field order and incidental spacing never change the resulting hash.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let canonical_map = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(canonical_map)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::String(s) => Value::String(normalize_whitespace(s)),
        other => other.clone(),
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_order_does_not_change_fingerprint() {
        let a = json!({"type": "character", "style": "pixel-art", "description": "A brave knight"});
        let b = json!({"description": "A brave knight", "style": "pixel-art", "type": "character"});
        assert_eq!(
            fingerprint_of(&a).unwrap().to_hex(),
            fingerprint_of(&b).unwrap().to_hex()
        );
    }

    #[test]
    fn incidental_whitespace_does_not_change_fingerprint() {
        let a = json!({"description": "A brave knight"});
        let b = json!({"description": "A   brave    knight"});
        assert_eq!(
            fingerprint_of(&a).unwrap().to_hex(),
            fingerprint_of(&b).unwrap().to_hex()
        );
    }

    #[test]
    fn differing_requests_do_not_collide() {
        let a = json!({"description": "A brave knight"});
        let b = json!({"description": "A cowardly knight"});
        assert_ne!(
            fingerprint_of(&a).unwrap().to_hex(),
            fingerprint_of(&b).unwrap().to_hex()
        );
    }

    #[test]
    fn fingerprint_is_stable_across_calls() {
        let a = json!({"description": "Stable across restarts"});
        let first = fingerprint_of(&a).unwrap();
        let second = fingerprint_of(&a).unwrap();
        assert_eq!(first, second);
    }
}
