//! Deterministic value fingerprinting.
//!
//! A fingerprint is a blake3 digest of a value's canonical byte form. The
//! encoding is type-tagged and length-prefixed, and object keys are visited
//! in sorted order, so structurally equal composites hash equal regardless of
//! how they were constructed. This is what lets the store decide whether a
//! write carries new information without keeping old values around.

use blake3::Hasher;

use crate::error::CanonicalizationError;
use crate::value::Value;

/// Size of a fingerprint digest in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Content fingerprint of a property value.
///
/// Two fingerprints compare equal iff the canonical serializations of the
/// underlying values are byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex rendering of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(FINGERPRINT_LEN * 2);
        for b in &self.0 {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the fingerprint of a value.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] when the value has no canonical byte
/// form (non-finite floats).
pub fn fingerprint(value: &Value) -> Result<Fingerprint, CanonicalizationError> {
    let mut hasher = Hasher::new();
    write_value(&mut hasher, value)?;
    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

// One-byte type tags keep distinct types from colliding even when their
// payload bytes happen to match (e.g. Int(0) vs Bool(false) padding).
const TAG_NULL: &[u8] = b"z";
const TAG_BOOL: &[u8] = b"b";
const TAG_INT: &[u8] = b"i";
const TAG_UINT: &[u8] = b"u";
const TAG_FLOAT: &[u8] = b"f";
const TAG_STRING: &[u8] = b"s";
const TAG_ARRAY: &[u8] = b"a";
const TAG_OBJECT: &[u8] = b"o";

fn write_value(h: &mut Hasher, value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null => {
            h.update(TAG_NULL);
        }
        Value::Bool(v) => {
            h.update(TAG_BOOL);
            h.update(&[u8::from(*v)]);
        }
        Value::Int(v) => {
            h.update(TAG_INT);
            h.update(&v.to_le_bytes());
        }
        Value::Float(v) => {
            write_float(h, *v)?;
        }
        Value::String(v) => {
            write_str(h, v);
        }
        Value::Structured(v) => {
            write_json(h, v)?;
        }
    }
    Ok(())
}

fn write_float(h: &mut Hasher, v: f64) -> Result<(), CanonicalizationError> {
    if !v.is_finite() {
        return Err(CanonicalizationError::NonFiniteFloat { value: v });
    }
    // Fold -0.0 into 0.0 so equal floats always hash equal.
    let v = if v == 0.0 { 0.0 } else { v };
    h.update(TAG_FLOAT);
    h.update(&v.to_bits().to_le_bytes());
    Ok(())
}

fn write_str(h: &mut Hasher, s: &str) {
    h.update(TAG_STRING);
    h.update(&(s.len() as u64).to_le_bytes());
    h.update(s.as_bytes());
}

fn write_json(h: &mut Hasher, json: &serde_json::Value) -> Result<(), CanonicalizationError> {
    use serde_json::Value as Json;

    match json {
        Json::Null => {
            h.update(TAG_NULL);
        }
        Json::Bool(v) => {
            h.update(TAG_BOOL);
            h.update(&[u8::from(*v)]);
        }
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                h.update(TAG_INT);
                h.update(&v.to_le_bytes());
            } else if let Some(v) = n.as_u64() {
                h.update(TAG_UINT);
                h.update(&v.to_le_bytes());
            } else if let Some(v) = n.as_f64() {
                write_float(h, v)?;
            } else {
                return Err(CanonicalizationError::Serialization {
                    message: format!("unrepresentable JSON number: {n}"),
                });
            }
        }
        Json::String(v) => {
            write_str(h, v);
        }
        Json::Array(items) => {
            h.update(TAG_ARRAY);
            h.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_json(h, item)?;
            }
        }
        Json::Object(map) => {
            h.update(TAG_OBJECT);
            h.update(&(map.len() as u64).to_le_bytes());
            // Sorted key order makes the encoding canonical even when the
            // map preserves insertion order.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for key in keys {
                write_str(h, key);
                write_json(h, &map[key])?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_scalars_hash_equal() {
        let a = fingerprint(&Value::Int(100)).unwrap();
        let b = fingerprint(&Value::Int(100)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_scalars_hash_distinct() {
        let a = fingerprint(&Value::Int(100)).unwrap();
        let b = fingerprint(&Value::Int(200)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_tags_prevent_cross_type_collisions() {
        let int_zero = fingerprint(&Value::Int(0)).unwrap();
        let bool_false = fingerprint(&Value::Bool(false)).unwrap();
        let null = fingerprint(&Value::Null).unwrap();
        assert_ne!(int_zero, bool_false);
        assert_ne!(int_zero, null);
        assert_ne!(bool_false, null);
    }

    #[test]
    fn test_int_and_float_do_not_collide() {
        let i = fingerprint(&Value::Int(2)).unwrap();
        let f = fingerprint(&Value::Float(2.0)).unwrap();
        assert_ne!(i, f);
    }

    #[test]
    fn test_negative_zero_folds_into_zero() {
        let pos = fingerprint(&Value::Float(0.0)).unwrap();
        let neg = fingerprint(&Value::Float(-0.0)).unwrap();
        assert_eq!(pos, neg);
    }

    #[test]
    fn test_structural_equality_ignores_key_order() {
        let mut first = serde_json::Map::new();
        first.insert("user".to_string(), serde_json::json!("jim"));
        first.insert("color".to_string(), serde_json::json!("red"));

        let mut second = serde_json::Map::new();
        second.insert("color".to_string(), serde_json::json!("red"));
        second.insert("user".to_string(), serde_json::json!("jim"));

        let a = fingerprint(&Value::Structured(serde_json::Value::Object(first))).unwrap();
        let b = fingerprint(&Value::Structured(serde_json::Value::Object(second))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_field_change_is_detected() {
        let a = fingerprint(&Value::Structured(
            serde_json::json!({"user": "jim", "color": "red"}),
        ))
        .unwrap();
        let b = fingerprint(&Value::Structured(
            serde_json::json!({"user": "jim", "color": true}),
        ))
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_array_order_matters() {
        let a = fingerprint(&Value::Structured(serde_json::json!([1, 2, 3]))).unwrap();
        let b = fingerprint(&Value::Structured(serde_json::json!([3, 2, 1]))).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_string_and_empty_array_distinct() {
        let s = fingerprint(&Value::String(String::new())).unwrap();
        let a = fingerprint(&Value::Structured(serde_json::json!([]))).unwrap();
        assert_ne!(s, a);
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = fingerprint(&Value::Float(bad)).unwrap_err();
            assert!(matches!(
                err,
                CanonicalizationError::NonFiniteFloat { .. }
            ));
        }
    }

    #[test]
    fn test_hex_rendering_round_trips() {
        let fp = fingerprint(&Value::String("score".into())).unwrap();
        let hex_str = fp.to_hex();
        assert_eq!(hex_str.len(), FINGERPRINT_LEN * 2);
        let bytes = hex::decode(&hex_str).unwrap();
        assert_eq!(bytes.as_slice(), fp.as_bytes());
        assert_eq!(format!("{fp}"), hex_str);
    }

    #[test]
    fn test_fingerprint_is_stable_across_clones() {
        let original = Value::Structured(serde_json::json!({"nested": {"a": [1, 2]}}));
        let cloned = original.clone();
        assert_eq!(
            fingerprint(&original).unwrap(),
            fingerprint(&cloned).unwrap()
        );
    }
}
