//! Canonical serialization and the item hash function
//!
//! Hashes identify item revisions across implementations, so both halves are
//! fully specified:
//!
//! - [`stable_serialize`] renders JSON compactly with object keys sorted
//!   recursively, independent of the map ordering `serde_json` was built with.
//! - [`string_hash`] is the 32-bit string hash `h = (h << 5) - h + unit` over
//!   UTF-16 code units with wrapping arithmetic.

use serde::Serialize;
use serde_json::Value;

use super::errors::DomainError;

/// Serializes a JSON value with recursively sorted object keys
pub fn stable_serialize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// 32-bit string hash over UTF-16 code units
///
/// Returns 0 for the empty string.
pub fn string_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |hash, unit| {
        (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    })
}

/// Hashes the canonical form of a JSON value
pub fn hash_value(value: &Value) -> i64 {
    i64::from(string_hash(&stable_serialize(value)))
}

/// Hashes the canonical form of any serializable value, ignoring the
/// top-level `hash` field
///
/// # Errors
/// Returns error if the value cannot be represented as JSON
pub fn hash_without_hash_field<T: Serialize>(value: &T) -> Result<i64, DomainError> {
    let mut json = serde_json::to_value(value)
        .map_err(|e| DomainError::MalformedPayload(format!("Cannot serialize value: {e}")))?;
    if let Value::Object(ref mut map) = json {
        map.remove("hash");
    }
    Ok(hash_value(&json))
}

/// Renders an unsigned integer in lowercase base 36
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
