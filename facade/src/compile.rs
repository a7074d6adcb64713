//! Evidence compilation: user constraints → per-node allowed token sets.
//!
//! The pipeline (per flattened constraint key): resolve the key to a root
//! node and nested path, match the constraint against the node's decoded
//! possibilities, then store the admitted tokens under the root. A
//! feasibility pass follows before any sampling.
//!
//! Matching is structural over parsed JSON, case-insensitive at the
//! string and object-key level only — possibilities are stored as JSON
//! strings, so parsing once per node and comparing structurally is the
//! normalized form.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use facade_engine::{marginal, BeamPolicy, EngineError, Evidence};
use facade_model::Model;

use crate::constraints::{ConstraintMap, FlatLeaf};
use crate::error::{Error, Result};
use crate::paths::{at_path, node_possibilities, root_possibilities, RootPossibilities};

/// Compile `constraints` into `evidence`, intersecting with any entries
/// already present (several dotted keys may land on one root node).
///
/// # Errors
///
/// [`Error::InvalidNode`] when a key resolves to no node;
/// [`Error::InvalidConstraints`] when a constraint admits no value, or
/// when constraints on the same node contradict each other.
pub(crate) fn compile_into(
    model: &Model,
    constraints: &ConstraintMap,
    evidence: &mut Evidence,
) -> Result<()> {
    for (key, leaf) in constraints.flatten() {
        let (root, nested, possibilities) = resolve(model, &key)?;

        let mut matched: IndexSet<String> = IndexSet::new();
        for (raw, token) in &possibilities {
            let value: Value = serde_json::from_str(raw)?;
            let target = if nested.is_empty() {
                &value
            } else {
                match at_path(&value, &nested) {
                    Ok(sub) => sub,
                    // This possibility simply lacks the field; skip it.
                    Err(_) => continue,
                }
            };
            let admitted = match &leaf {
                FlatLeaf::Candidates(candidates) => {
                    candidates.iter().any(|c| json_eq_fold(target, c))
                }
                FlatLeaf::Predicate(predicate) => predicate(target),
            };
            if admitted {
                matched.insert(token.clone());
            }
        }

        if matched.is_empty() {
            return Err(Error::InvalidConstraints(no_match_message(
                &root, &nested, &leaf,
            )));
        }

        let intersection = match evidence.get(&root) {
            Some(existing) => {
                let kept: Vec<String> = existing
                    .iter()
                    .filter(|t| matched.contains(*t))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    return Err(Error::InvalidConstraints(format!(
                        "constraints on node '{root}' contradict each other"
                    )));
                }
                kept
            }
            None => matched.into_iter().collect(),
        };
        evidence.allow(&root, intersection);
    }
    Ok(())
}

/// Resolve a flattened key to `(canonical root name, nested path,
/// decoded possibilities)`.
fn resolve(model: &Model, key: &str) -> Result<RootPossibilities> {
    if let Some(possibilities) = node_possibilities(model, key, false)? {
        let canonical = model
            .network()
            .node(key)
            .map(|n| n.name().to_string())
            .unwrap_or_else(|| key.to_string());
        return Ok((canonical, Vec::new(), possibilities));
    }
    if let Some(found) = root_possibilities(model, key, false)? {
        return Ok(found);
    }
    Err(Error::InvalidNode(key.to_string()))
}

fn no_match_message(root: &str, nested: &[String], leaf: &FlatLeaf) -> String {
    let rendered = match leaf {
        FlatLeaf::Candidates(candidates) => {
            let parts: Vec<String> = candidates.iter().map(ToString::to_string).collect();
            parts.join(", ")
        }
        FlatLeaf::Predicate(_) => "<predicate>".to_string(),
    };
    if nested.is_empty() {
        format!("{rendered} is not a possible value of node '{root}'")
    } else {
        format!(
            "{rendered} is not a possible value of node '{root}' at '{}'",
            nested.join(".")
        )
    }
}

/// Structural JSON equality, case-insensitive at the string and
/// object-key level; numbers compare numerically (`1920 == 1920.0`).
pub(crate) fn json_eq_fold(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::String(x), Value::String(y)) => x.to_lowercase() == y.to_lowercase(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq_fold(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(key, x)| {
                    let folded = key.to_lowercase();
                    ys.iter()
                        .find(|(other, _)| other.to_lowercase() == folded)
                        .is_some_and(|(_, y)| json_eq_fold(x, y))
                })
        }
        _ => false,
    }
}

/// Pre-flight feasibility (run before any sampling): every evidence node
/// that has at least one single-valued sibling is traced against those
/// siblings; a node whose allowed values all carry zero mass makes the
/// evidence jointly infeasible.
///
/// # Errors
///
/// [`Error::RestrictiveConstraints`] naming the node, up to five of its
/// allowed values, and the conflicting siblings.
pub(crate) fn assert_feasible(
    model: &Model,
    evidence: &Evidence,
    policy: &BeamPolicy,
) -> Result<()> {
    for (name, allowed) in evidence.iter() {
        let fixed: Vec<(&str, &IndexSet<String>)> = evidence
            .iter()
            .filter(|(other, tokens)| *other != name && tokens.len() == 1)
            .collect();
        if fixed.is_empty() {
            continue;
        }

        let mut siblings = Evidence::new();
        for (sibling, tokens) in &fixed {
            siblings.allow(sibling, tokens.iter().cloned());
        }
        let index = model
            .network()
            .index_of(name)
            .ok_or_else(|| Error::InvalidNode(name.to_string()))?;

        let dist = match marginal(model.network(), index, &siblings, policy) {
            Ok(dist) => dist,
            // The siblings alone admit nothing; zero mass everywhere.
            Err(EngineError::BeamCollapsed { .. }) => IndexMap::new(),
            Err(other) => return Err(other.into()),
        };

        let feasible = allowed
            .iter()
            .any(|token| dist.get(token).is_some_and(|p| *p > 0.0));
        if !feasible {
            return Err(restrictive_error(model, name, allowed, &fixed));
        }
    }
    Ok(())
}

fn restrictive_error(
    model: &Model,
    name: &str,
    allowed: &IndexSet<String>,
    fixed: &[(&str, &IndexSet<String>)],
) -> Error {
    let display = model
        .network()
        .node(name)
        .map_or_else(|| name.to_string(), |n| n.name().to_string());

    let sample: Vec<&String> = allowed.iter().take(5).collect();
    let values = model
        .values()
        .lookup_many(&sample)
        .unwrap_or_else(|_| sample.iter().map(|t| (*t).clone()).collect());

    let mut siblings = Vec::with_capacity(fixed.len());
    for (sibling, tokens) in fixed {
        let token = tokens.iter().next().map(String::as_str).unwrap_or_default();
        let value = model
            .values()
            .lookup(token)
            .unwrap_or_else(|_| token.to_string());
        siblings.push(format!("{sibling}={value}"));
    }

    Error::RestrictiveConstraints(format!(
        "node '{display}' cannot take any of [{}] given {}",
        values.join(", "),
        siblings.join(", ")
    ))
}
