// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Canonical content hashing for configuration change detection.
//!
//! Two independently-running reconcilers must agree on whether a
//! configuration changed, so the digest is computed over a canonical textual
//! form rather than any serializer's default output:
//!
//! - mappings are written with keys sorted lexicographically
//! - sequences keep their original order
//! - scalars are type-tagged (`str:`, `int:`, `float:`, `bool:`, `null`) so
//!   `1` and `"1"` hash differently
//! - strings and map keys carry a byte-length prefix, so text containing
//!   the structural characters cannot forge structure
//! - integers are written in decimal, floats with Rust's shortest
//!   round-trip formatting
//!
//! The digest is the first [`HASH_LEN`](crate::constants::HASH_LEN) hex
//! characters of a SHA-256 over that form. Ledger entries and ConfigMap
//! names embed these digests, so the canonical form is a persistent format.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::constants::HASH_LEN;

/// Hash a list of values as one digest. Total over any JSON tree.
pub fn hash_values(values: &[&Value]) -> String {
    let mut canonical = String::new();
    for value in values {
        write_canonical(&mut canonical, value);
    }
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..HASH_LEN].to_string()
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null;"),
        Value::Bool(b) => {
            out.push_str("bool:");
            out.push_str(if *b { "true" } else { "false" });
            out.push(';');
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&format!("int:{};", i));
            } else if let Some(u) = n.as_u64() {
                out.push_str(&format!("int:{};", u));
            } else {
                out.push_str(&format!("float:{};", n.as_f64().unwrap_or(f64::NAN)));
            }
        }
        Value::String(s) => {
            out.push_str(&format!("str:{}:", s.len()));
            out.push_str(s);
            out.push(';');
        }
        Value::Array(items) => {
            out.push_str("s[");
            for item in items {
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push_str("m{");
            for key in keys {
                out.push_str(&format!("{}:", key.len()));
                out.push_str(key);
                out.push('=');
                write_canonical(out, &map[key]);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_fixed_length() {
        let v = json!({"a": 1});
        assert_eq!(hash_values(&[&v]).len(), HASH_LEN);
    }

    #[test]
    fn test_hash_is_order_independent_for_maps() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(hash_values(&[&a]), hash_values(&[&b]));
    }

    #[test]
    fn test_hash_is_order_sensitive_for_sequences() {
        let a = json!(["x", "y"]);
        let b = json!(["y", "x"]);
        assert_ne!(hash_values(&[&a]), hash_values(&[&b]));
    }

    #[test]
    fn test_leaf_change_changes_hash() {
        let a = json!({"outer": {"inner": 1}});
        let b = json!({"outer": {"inner": 2}});
        assert_ne!(hash_values(&[&a]), hash_values(&[&b]));
    }

    #[test]
    fn test_scalar_types_are_distinguished() {
        let number = json!({"v": 1});
        let string = json!({"v": "1"});
        assert_ne!(hash_values(&[&number]), hash_values(&[&string]));
    }

    #[test]
    fn test_nested_maps_sorted_recursively() {
        let a: Value = serde_json::from_str(r#"{"m": {"x": 1, "y": 2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"m": {"y": 2, "x": 1}}"#).unwrap();
        assert_eq!(hash_values(&[&a]), hash_values(&[&b]));
    }

    #[test]
    fn test_strings_containing_tags_do_not_collide() {
        let joined = json!(["a;str:b"]);
        let split = json!(["a", "b"]);
        assert_ne!(hash_values(&[&joined]), hash_values(&[&split]));
    }

    #[test]
    fn test_keys_containing_separators_do_not_collide() {
        let forged: Value = serde_json::from_str(r#"{"a=int:1;b": 2}"#).unwrap();
        let plain: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_ne!(hash_values(&[&forged]), hash_values(&[&plain]));
    }

    #[test]
    fn test_multiple_values_differ_from_merged_value() {
        let a = json!({"a": 1});
        let b = json!({"b": 2});
        let merged = json!({"a": 1, "b": 2});
        assert_ne!(hash_values(&[&a, &b]), hash_values(&[&merged]));
    }

    #[test]
    fn test_stable_across_calls() {
        let v = json!({"data": {"key": "value"}, "list": [1, 2, 3]});
        assert_eq!(hash_values(&[&v]), hash_values(&[&v]));
    }
}
