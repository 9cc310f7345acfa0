//! Diff-based compaction of version-array lists.
//!
//! The wire format is an external, versioned contract shared with every
//! client that understands the `composer/2.0` marker: the first version is
//! kept whole, each following entry carries only the keys that were added
//! or changed against the immediately preceding version, and a removed key
//! is marked with the `__unset` sentinel. Expansion is the exact inverse,
//! so `expand(minify(v)) == v` for every input.

use serde_json::{Map, Value};

/// Format marker stamped into minified documents.
pub const MINIFY_FORMAT: &str = "composer/2.0";

/// Sentinel marking a key removed relative to the preceding version.
const UNSET: &str = "__unset";

/// Compacts an ordered list of version arrays.
///
/// Inputs that are not JSON objects are passed through untouched; the
/// catalog only ever produces objects here.
pub fn minify(versions: &[Value]) -> Vec<Value> {
    let mut minified = Vec::with_capacity(versions.len());
    let mut previous: Option<&Map<String, Value>> = None;

    for version in versions {
        let Some(current) = version.as_object() else {
            minified.push(version.clone());
            previous = None;
            continue;
        };

        match previous {
            None => minified.push(version.clone()),
            Some(prev) => {
                let mut diff = Map::new();
                for (key, value) in current {
                    if prev.get(key) != Some(value) {
                        diff.insert(key.clone(), value.clone());
                    }
                }
                for key in prev.keys() {
                    if !current.contains_key(key) {
                        diff.insert(key.clone(), Value::String(UNSET.to_string()));
                    }
                }
                minified.push(Value::Object(diff));
            }
        }

        previous = Some(current);
    }

    minified
}

/// Expands a minified list back into whole version arrays.
pub fn expand(minified: &[Value]) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(minified.len());
    let mut carry: Option<Map<String, Value>> = None;

    for entry in minified {
        let Some(diff) = entry.as_object() else {
            expanded.push(entry.clone());
            carry = None;
            continue;
        };

        let current = match carry {
            None => diff.clone(),
            Some(mut base) => {
                for (key, value) in diff {
                    if value.as_str() == Some(UNSET) {
                        base.shift_remove(key);
                    } else {
                        base.insert(key.clone(), value.clone());
                    }
                }
                base
            }
        };

        expanded.push(Value::Object(current.clone()));
        carry = Some(current);
    }

    expanded
}
