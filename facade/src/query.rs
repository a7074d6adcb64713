//! Possibility queries.
//!
//! `query` answers "what can this key be?" without running inference:
//! a node's own possibilities, the possibilities of a field inside a
//! node, or — for a bare prefix — a nested map of every descendant
//! node's possibilities.

use indexmap::IndexMap;
use serde_json::Value;

use facade_model::Model;

use crate::error::Result;
use crate::paths::{at_path, node_possibilities, root_possibilities, search_downward};
use crate::shape::{dedupe, flatten_value, merge_possibility_maps, nest};

/// Enumerate the possibilities of `target`.
///
/// # Errors
///
/// [`crate::Error::InvalidNode`] when the target matches nothing;
/// [`crate::Error::NodePath`] when a sub-path does not exist inside the
/// node's values.
pub(crate) fn run_query(model: &Model, target: &str, flatten: bool, sort: bool) -> Result<Value> {
    // A node's own possibilities.
    if let Some(possibilities) = node_possibilities(model, target, false)? {
        let parsed = parse_all(possibilities.keys())?;
        return Ok(merge_or_dedupe(parsed, flatten, sort));
    }

    // A field inside a node: descend each possibility to the sub-path.
    if let Some((_, nested, possibilities)) = root_possibilities(model, target, false)? {
        let mut picked = Vec::with_capacity(possibilities.len());
        for raw in possibilities.keys() {
            let value: Value = serde_json::from_str(raw)?;
            picked.push(at_path(&value, &nested)?.clone());
        }
        return Ok(merge_or_dedupe(picked, flatten, sort));
    }

    // A prefix above one or more nodes: collect per-descendant lists.
    let names = search_downward(model.network(), target)?;
    let mut entries: IndexMap<String, Value> = IndexMap::with_capacity(names.len());
    for name in names {
        let Some(trimmed) = trim_prefix(&name, target) else {
            continue;
        };
        let possibilities = node_possibilities(model, &name, false)?.unwrap_or_default();
        let parsed = parse_all(possibilities.keys())?;
        entries.insert(trimmed.to_string(), Value::Array(dedupe(parsed, sort)));
    }
    if flatten {
        // Keys stay dotted; the lists are already leaves.
        return Ok(Value::Object(entries.into_iter().collect()));
    }
    Ok(nest(entries))
}

fn parse_all<'a>(raw: impl Iterator<Item = &'a String>) -> Result<Vec<Value>> {
    let mut parsed = Vec::new();
    for value in raw {
        parsed.push(serde_json::from_str(value)?);
    }
    Ok(parsed)
}

/// Merge when every possibility is an object, dedupe into a list
/// otherwise.
fn merge_or_dedupe(values: Vec<Value>, flatten: bool, sort: bool) -> Value {
    if !values.is_empty() && values.iter().all(Value::is_object) {
        let merged = merge_possibility_maps(&values, sort);
        if flatten {
            return flatten_value(&merged);
        }
        return merged;
    }
    Value::Array(dedupe(values, sort))
}

/// Strip `prefix.` from a descendant node name, case-insensitively.
/// `None` when the name *is* the prefix (handled by the direct-node arm).
fn trim_prefix<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    if name.len() > prefix.len() + 1 {
        Some(&name[prefix.len() + 1..])
    } else {
        None
    }
}
