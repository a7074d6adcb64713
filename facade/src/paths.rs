//! Path and target resolution.
//!
//! User keys don't have to name a node exactly: `screen.width` resolves
//! *into* the `screen` node, while `navigator` resolves to every node
//! *under* it (`navigator.language`, `navigator.productsub`, …). Node
//! names themselves may be dotted, so resolution is by name table, not by
//! splitting alone.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use facade_model::{Model, Network};

use crate::error::{Error, Result};

/// Decoded possibilities of a node: value string → value-index token.
///
/// `fold_values` stores the case-folded form of each value string, which
/// is what constraint matching compares against; display paths keep the
/// original text. Returns `None` for an unknown node name.
pub(crate) fn node_possibilities(
    model: &Model,
    name: &str,
    fold_values: bool,
) -> Result<Option<IndexMap<String, String>>> {
    let Some(node) = model.network().node(name) else {
        return Ok(None);
    };
    let tokens = node.possible_values();
    let decoded = model.values().lookup_many(tokens)?;
    let mut map = IndexMap::with_capacity(tokens.len());
    for (value, token) in decoded.into_iter().zip(tokens) {
        let key = if fold_values { value.to_lowercase() } else { value };
        map.insert(key, token.clone());
    }
    Ok(Some(map))
}

/// A resolved in-node key: canonical root name, nested path below it,
/// and the root's decoded possibilities.
pub(crate) type RootPossibilities = (String, Vec<String>, IndexMap<String, String>);

/// Resolve a dotted key to the nearest enclosing node, collecting the
/// stripped trailing segments as the nested path (restored to original
/// order). The full key itself is not tried — callers check that first.
///
/// Returns `None` when no prefix of the key names a node.
pub(crate) fn root_possibilities(
    model: &Model,
    key: &str,
    fold_values: bool,
) -> Result<Option<RootPossibilities>> {
    let mut head = key;
    let mut nested: Vec<String> = Vec::new();
    while let Some((prefix, segment)) = head.rsplit_once('.') {
        nested.push(segment.to_string());
        head = prefix;
        if let Some(possibilities) = node_possibilities(model, head, fold_values)? {
            nested.reverse();
            let canonical = model
                .network()
                .node(head)
                .map(|n| n.name().to_string())
                .unwrap_or_else(|| head.to_string());
            return Ok(Some((canonical, nested, possibilities)));
        }
    }
    Ok(None)
}

/// All node display names at or under a dotted prefix (`prefix` itself or
/// `prefix.…`), case-insensitively.
///
/// # Errors
///
/// [`Error::InvalidNode`] when nothing matches.
pub(crate) fn search_downward(network: &Network, prefix: &str) -> Result<Vec<String>> {
    let folded = prefix.to_lowercase();
    let mut found = Vec::new();
    for node in network.nodes() {
        let name = node.folded_name();
        if name == folded || (name.starts_with(&folded) && name.as_bytes().get(folded.len()) == Some(&b'.')) {
            found.push(node.name().to_string());
        }
    }
    if found.is_empty() {
        return Err(Error::InvalidNode(prefix.to_string()));
    }
    Ok(found)
}

/// Map each target to the root node(s) that carry its data.
///
/// A target that names a node maps to it; a dotted target falls back to
/// its nearest enclosing node; anything else is treated as a prefix over
/// the name table. Duplicates collapse, first-seen order wins.
pub(crate) fn find_roots<S: AsRef<str>>(network: &Network, targets: &[S]) -> Result<Vec<String>> {
    let mut roots: IndexSet<String> = IndexSet::new();
    for target in targets {
        let mut head = target.as_ref();
        loop {
            if let Some(node) = network.node(head) {
                roots.insert(node.name().to_string());
                break;
            }
            if let Some((prefix, _)) = head.rsplit_once('.') {
                head = prefix;
                continue;
            }
            // Out of segments: sweep below the bare prefix instead.
            roots.extend(search_downward(network, head)?);
            break;
        }
    }
    Ok(roots.into_iter().collect())
}

/// Descend a decoded JSON value by path segments, matching object keys
/// case-insensitively.
///
/// # Errors
///
/// [`Error::NodePath`] naming the first missing segment.
pub(crate) fn at_path<'v>(mut value: &'v Value, path: &[String]) -> Result<&'v Value> {
    for segment in path {
        let next = value.as_object().and_then(|map| {
            map.get(segment.as_str()).or_else(|| {
                let folded = segment.to_lowercase();
                map.iter()
                    .find(|(key, _)| key.to_lowercase() == folded)
                    .map(|(_, v)| v)
            })
        });
        match next {
            Some(v) => value = v,
            None => {
                return Err(Error::NodePath {
                    segment: segment.clone(),
                })
            }
        }
    }
    Ok(value)
}

/// Pull each original target back out of an assembled fingerprint.
///
/// # Errors
///
/// [`Error::InvalidConstraints`] naming the target and its missing
/// segment.
pub(crate) fn reassemble_targets<S: AsRef<str>>(
    targets: &[S],
    fingerprint: &Value,
) -> Result<IndexMap<String, Value>> {
    let mut out = IndexMap::with_capacity(targets.len());
    for target in targets {
        let target = target.as_ref();
        let path: Vec<String> = target.split('.').map(str::to_string).collect();
        let value = at_path(fingerprint, &path).map_err(|err| match err {
            Error::NodePath { segment } => Error::InvalidConstraints(format!(
                "'{target}' is not a valid key path (missing '{segment}')"
            )),
            other => other,
        })?;
        out.insert(target.to_string(), value.clone());
    }
    Ok(out)
}
