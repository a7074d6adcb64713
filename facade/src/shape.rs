//! Output shaping: dedupe, nest/flatten, possibility merging.
//!
//! These helpers operate on decoded `serde_json::Value`s at the API
//! boundary. Nothing here touches tokens or the network.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use facade_model::ValueStore;

use crate::error::Result;

/// Group rank for deduping: values are bucketed by kind so incomparable
/// kinds never interleave. The rank order is fixed: arrays, bools,
/// numbers, nulls, objects, strings.
fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Array(_) => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::Null => 3,
        Value::Object(_) => 4,
        Value::String(_) => 5,
    }
}

/// Dedupe a list of values, grouping by kind.
///
/// Within each kind group the first occurrence wins and insertion order
/// is kept; under `sort`, scalar groups (bools, numbers, strings) sort
/// ascending while arrays and objects always keep insertion order.
pub(crate) fn dedupe(values: Vec<Value>, sort: bool) -> Vec<Value> {
    let mut groups: [Vec<Value>; 6] = Default::default();
    for value in values {
        let group = &mut groups[kind_rank(&value) as usize];
        if !group.contains(&value) {
            group.push(value);
        }
    }

    if sort {
        groups[1].sort_by_key(|v| v.as_bool());
        groups[2].sort_by(|a, b| {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.total_cmp(&b)
        });
        groups[5].sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    }

    groups.into_iter().flatten().collect()
}

/// Rebuild a nested object from dotted keys.
///
/// Some node names are themselves dotted (`navigator.language`), so this
/// is structural: each segment opens (or reuses) an object layer.
pub(crate) fn nest(entries: IndexMap<String, Value>) -> Value {
    let mut root = Map::new();
    for (key, value) in entries {
        let mut cursor = &mut root;
        let mut segments = key.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                cursor.insert(segment.to_string(), value);
                break;
            }
            let slot = cursor
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(map) => cursor = map,
                // A scalar already sits where nesting wants an object;
                // the later, deeper key wins by replacing it.
                other => {
                    *other = Value::Object(Map::new());
                    let Value::Object(map) = other else { unreachable!() };
                    cursor = map;
                }
            }
        }
    }
    Value::Object(root)
}

/// Flatten a nested object into dotted keys (inverse of [`nest`] for
/// object-only interiors; non-object leaves pass through).
pub(crate) fn flatten_value(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut flat = Map::new();
    flatten_into("", map, &mut flat);
    Value::Object(flat)
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in map {
        let flat_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(&flat_key, inner, out),
            other => {
                out.insert(flat_key, other.clone());
            }
        }
    }
}

/// Merge a list of same-shaped dicts into one dict of possibility lists.
///
/// Per key: all-dict values merge recursively; all-list values concatenate
/// and dedupe; anything else collects into a deduped list. Key order is
/// first-seen across the inputs.
pub(crate) fn merge_possibility_maps(maps: &[Value], sort: bool) -> Value {
    let mut keys: Vec<&String> = Vec::new();
    for value in maps {
        if let Value::Object(map) = value {
            for key in map.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
    }

    let mut merged = Map::new();
    for key in keys {
        let values: Vec<&Value> = maps
            .iter()
            .filter_map(|m| m.as_object().and_then(|m| m.get(key.as_str())))
            .collect();

        let entry = if values.iter().all(|v| v.is_object()) {
            let owned: Vec<Value> = values.into_iter().cloned().collect();
            merge_possibility_maps(&owned, sort)
        } else if values.iter().all(|v| v.is_array()) {
            let concatenated: Vec<Value> = values
                .into_iter()
                .flat_map(|v| v.as_array().cloned().unwrap_or_default())
                .collect();
            Value::Array(dedupe(concatenated, sort))
        } else {
            Value::Array(dedupe(values.into_iter().cloned().collect(), sort))
        };
        merged.insert(key.clone(), entry);
    }
    Value::Object(merged)
}

/// Decode a sampled `node name → token` map into the caller-facing
/// fingerprint: flat (dotted keys, nested node values flattened too) or
/// structurally nested.
pub(crate) fn make_output(
    sample: IndexMap<String, String>,
    store: &ValueStore,
    flatten: bool,
) -> Result<Value> {
    let tokens: Vec<&String> = sample.values().collect();
    let decoded = store.lookup_many(&tokens)?;

    let mut entries: IndexMap<String, Value> = IndexMap::with_capacity(sample.len());
    for (name, raw) in sample.keys().zip(decoded) {
        entries.insert(name.clone(), serde_json::from_str(&raw)?);
    }

    if flatten {
        let flat = flatten_value(&nest(entries));
        return Ok(flat);
    }
    Ok(nest(entries))
}
