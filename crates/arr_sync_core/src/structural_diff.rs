//! Deep comparison of JSON documents with server-tolerant rules.
//!
//! [`compare`] walks the desired document and checks every value against the server
//! document at the same path:
//!
//! - keys only the server has are ignored, so fields the application adds in newer versions
//!   never cause spurious changes;
//! - numbers compare by value, so `1` and `1.0` are equal;
//! - arrays compare positionally and a length mismatch is a change, except for arrays named
//!   `fields` (custom-format specification fields) where a longer server array is tolerated
//!   and only a shorter one is a change.

use serde_json::{Map, Value};

#[cfg(test)]
#[path = "structural_diff_tests.rs"]
mod tests;

const FIELDS_KEY: &str = "fields";
const FLOAT_TOLERANCE: f64 = 1e-9;

/// The outcome of a comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralDiff {
    pub equal: bool,
    /// One message per difference, prefixed with the path of the differing value
    pub changes: Vec<String>,
}

/// Compares `server` against `desired`.
pub fn compare(server: &Value, desired: &Value) -> StructuralDiff {
    let mut changes = Vec::new();
    compare_value("", None, server, desired, &mut changes);
    StructuralDiff {
        equal: changes.is_empty(),
        changes,
    }
}

fn compare_value(
    path: &str,
    key: Option<&str>,
    server: &Value,
    desired: &Value,
    changes: &mut Vec<String>,
) {
    match (server, desired) {
        (Value::Object(server), Value::Object(desired)) => {
            compare_object(path, server, desired, changes)
        }
        (Value::Array(server), Value::Array(desired)) => {
            compare_array(path, key, server, desired, changes)
        }
        (Value::Number(s), Value::Number(d)) => {
            let equal = match (s.as_f64(), d.as_f64()) {
                (Some(s), Some(d)) => (s - d).abs() < FLOAT_TOLERANCE,
                _ => s == d,
            };
            if !equal {
                changes.push(format!("{}: {} -> {}", display_path(path), s, d));
            }
        }
        (server, desired) => {
            if server != desired {
                changes.push(format!("{}: {} -> {}", display_path(path), server, desired));
            }
        }
    }
}

fn compare_object(
    path: &str,
    server: &Map<String, Value>,
    desired: &Map<String, Value>,
    changes: &mut Vec<String>,
) {
    for (key, desired_value) in desired {
        let child = join(path, key);
        match server.get(key) {
            Some(server_value) => {
                compare_value(&child, Some(key), server_value, desired_value, changes)
            }
            None if desired_value.is_null() => {}
            None => changes.push(format!("{}: missing -> {}", child, desired_value)),
        }
    }
}

fn compare_array(
    path: &str,
    key: Option<&str>,
    server: &[Value],
    desired: &[Value],
    changes: &mut Vec<String>,
) {
    let length_mismatch = if key == Some(FIELDS_KEY) {
        server.len() < desired.len()
    } else {
        server.len() != desired.len()
    };
    if length_mismatch {
        changes.push(format!(
            "{}: length {} -> {}",
            display_path(path),
            server.len(),
            desired.len()
        ));
    }

    for (index, (server_item, desired_item)) in server.iter().zip(desired).enumerate() {
        let child = format!("{}[{}]", path, index);
        compare_value(&child, None, server_item, desired_item, changes);
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
