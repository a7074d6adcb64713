//! Conditional marginal distributions at the API boundary.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use facade_engine::{marginal, BeamPolicy, Evidence};
use facade_model::Model;

use crate::error::{Error, Result};

/// One entry of a traced distribution: a decoded value and its
/// probability under the evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceResult {
    /// The decoded node value.
    pub value: Value,
    /// Probability in `[0, 1]`; a traced distribution sums to ≈1.
    pub probability: f64,
}

impl fmt::Display for TraceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {:.5}%>", self.value, self.probability * 100.0)
    }
}

/// Result shape for multi-root traces: distributions at the leaves,
/// nested maps above them.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceTree {
    /// A single node's distribution, sorted by descending probability.
    Distribution(Vec<TraceResult>),
    /// Nested results keyed by name segment (or by full root name when
    /// flattened).
    Branch(IndexMap<String, TraceTree>),
}

impl TraceTree {
    /// The distribution, when this is a leaf.
    #[must_use]
    pub fn as_distribution(&self) -> Option<&[TraceResult]> {
        match self {
            Self::Distribution(dist) => Some(dist),
            Self::Branch(_) => None,
        }
    }
}

/// Trace one root node: beam marginal, decode the surviving tokens, sort
/// by descending probability.
pub(crate) fn trace_root(
    model: &Model,
    root: &str,
    evidence: &Evidence,
    policy: &BeamPolicy,
) -> Result<Vec<TraceResult>> {
    let index = model
        .network()
        .index_of(root)
        .ok_or_else(|| Error::InvalidNode(root.to_string()))?;
    let dist = marginal(model.network(), index, evidence, policy)?;

    let tokens: Vec<&String> = dist.keys().collect();
    let decoded = model.values().lookup_many(&tokens)?;

    let mut results = Vec::with_capacity(dist.len());
    for (raw, &probability) in decoded.into_iter().zip(dist.values()) {
        results.push(TraceResult {
            value: serde_json::from_str(&raw)?,
            probability,
        });
    }
    results.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(results)
}

/// Assemble distributions for several roots into a tree (or a flat map).
pub(crate) fn trace_roots(
    model: &Model,
    roots: &[String],
    evidence: &Evidence,
    policy: &BeamPolicy,
    flatten: bool,
) -> Result<TraceTree> {
    if let [root] = roots {
        return Ok(TraceTree::Distribution(trace_root(
            model, root, evidence, policy,
        )?));
    }

    if flatten {
        let mut flat = IndexMap::with_capacity(roots.len());
        for root in roots {
            flat.insert(
                root.clone(),
                TraceTree::Distribution(trace_root(model, root, evidence, policy)?),
            );
        }
        return Ok(TraceTree::Branch(flat));
    }

    let mut branches: IndexMap<String, TraceTree> = IndexMap::new();
    for root in roots {
        let dist = trace_root(model, root, evidence, policy)?;
        insert_nested(&mut branches, root, dist);
    }
    Ok(TraceTree::Branch(branches))
}

/// Insert a distribution under the dotted segments of its root name.
fn insert_nested(
    branches: &mut IndexMap<String, TraceTree>,
    root: &str,
    dist: Vec<TraceResult>,
) {
    let mut cursor = branches;
    let mut segments = root.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            cursor.insert(segment.to_string(), TraceTree::Distribution(dist));
            break;
        }
        let slot = cursor
            .entry(segment.to_string())
            .or_insert_with(|| TraceTree::Branch(IndexMap::new()));
        match slot {
            TraceTree::Branch(map) => cursor = map,
            TraceTree::Distribution(_) => {
                *slot = TraceTree::Branch(IndexMap::new());
                let TraceTree::Branch(map) = slot else {
                    unreachable!()
                };
                cursor = map;
            }
        }
    }
}
