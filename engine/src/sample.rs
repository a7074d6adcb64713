//! Consistent joint sampling.
//!
//! Nodes are visited in the network's sampling order. A node without
//! evidence draws straight from its CPT given the values decided so far.
//! A node under evidence first gets a local beam-search marginal
//! conditioned on everything decided plus the remaining evidence, which
//! is intersected with its allowed set and renormalized before drawing —
//! so the draw respects both the upstream sample and the constraints.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use rand::Rng;

use facade_model::{Network, Node};

use crate::beam::marginal;
use crate::error::EngineError;
use crate::evidence::Evidence;
use crate::policy::BeamPolicy;

/// Sample every node of the network. Returns node name → value token,
/// in sampling order.
///
/// # Errors
///
/// [`EngineError::EmptyDomain`] for a node with no values and no table;
/// [`EngineError::BeamCollapsed`] when an evidence node has zero mass and
/// no allowed values to fall back on.
pub fn full_sample<R: Rng>(
    network: &Network,
    evidence: &Evidence,
    policy: &BeamPolicy,
    rng: &mut R,
) -> Result<IndexMap<String, String>, EngineError> {
    let order: Vec<usize> = (0..network.len()).collect();
    sample_nodes(network, evidence, &order, policy, rng)
}

/// Sample only the given root nodes and their ancestors. Returns tokens
/// for exactly those nodes, in sampling order.
///
/// # Errors
///
/// Same failure modes as [`full_sample`].
pub fn targeted_sample<R: Rng>(
    network: &Network,
    evidence: &Evidence,
    roots: &[usize],
    policy: &BeamPolicy,
    rng: &mut R,
) -> Result<IndexMap<String, String>, EngineError> {
    let mut set: BTreeSet<usize> = BTreeSet::new();
    for &root in roots {
        set.insert(root);
        set.extend(network.ancestors(root));
    }
    let order: Vec<usize> = set.into_iter().collect();
    sample_nodes(network, evidence, &order, policy, rng)
}

fn sample_nodes<R: Rng>(
    network: &Network,
    evidence: &Evidence,
    order: &[usize],
    policy: &BeamPolicy,
    rng: &mut R,
) -> Result<IndexMap<String, String>, EngineError> {
    let mut decided: HashMap<usize, String> = HashMap::new();
    let mut out: IndexMap<String, String> = IndexMap::with_capacity(order.len());

    for &index in order {
        let node = network.node_at(index);
        let token = if let Some(allowed) = evidence.get(node.folded_name()) {
            sample_constrained(network, evidence, &decided, index, allowed, policy, rng)?
        } else {
            sample_free(network, &decided, node, rng)?
        };
        decided.insert(index, token.clone());
        out.insert(node.name().to_string(), token);
    }
    Ok(out)
}

/// Draw an unconstrained node from its CPT given the decided values,
/// falling back to a uniform over its possibilities when the table has
/// no entry for this parent path.
fn sample_free<R: Rng>(
    network: &Network,
    decided: &HashMap<usize, String>,
    node: &Node,
    rng: &mut R,
) -> Result<String, EngineError> {
    let leaf = node.probabilities_given(|parent| {
        network
            .index_of(parent)
            .and_then(|i| decided.get(&i))
            .map(String::as_str)
    });

    let pairs: Vec<(&str, f64)> = match leaf.filter(|l| !l.is_empty()) {
        Some(leaf) => leaf.iter().map(|(v, &p)| (v.as_str(), p)).collect(),
        None => {
            let values = node.possible_values();
            if values.is_empty() {
                return Err(EngineError::EmptyDomain {
                    node: node.name().to_string(),
                });
            }
            let uniform = 1.0 / values.len() as f64;
            values.iter().map(|v| (v.as_str(), uniform)).collect()
        }
    };

    draw(rng, &pairs).ok_or_else(|| EngineError::EmptyDomain {
        node: node.name().to_string(),
    })
}

/// Draw an evidence node: local beam marginal over everything decided plus
/// the remaining evidence, intersected with the allowed set.
fn sample_constrained<R: Rng>(
    network: &Network,
    evidence: &Evidence,
    decided: &HashMap<usize, String>,
    index: usize,
    allowed: &indexmap::IndexSet<String>,
    policy: &BeamPolicy,
    rng: &mut R,
) -> Result<String, EngineError> {
    let node = network.node_at(index);

    let mut conditioned = Evidence::new();
    for (&decided_index, token) in decided {
        conditioned.fix(network.node_at(decided_index).folded_name(), token.clone());
    }
    for (name, tokens) in evidence.iter() {
        if name == node.folded_name() {
            continue; // the node itself: its allowed set applies after the trace
        }
        if network.index_of(name).is_some_and(|i| decided.contains_key(&i)) {
            continue; // already pinned to the sampled value
        }
        conditioned.allow(name, tokens.iter().cloned());
    }

    let dist = match marginal(network, index, &conditioned, policy) {
        Ok(dist) => dist,
        // A collapsed local beam is "no mass", not a hard failure here;
        // the uniform fallback below still applies.
        Err(EngineError::BeamCollapsed { .. }) => IndexMap::new(),
        Err(other) => return Err(other),
    };

    let mut pairs: Vec<(String, f64)> = dist
        .into_iter()
        .filter(|(value, prob)| *prob > 0.0 && allowed.contains(value.as_str()))
        .collect();
    let mass: f64 = pairs.iter().map(|(_, p)| *p).sum();

    if pairs.is_empty() || mass <= 0.0 {
        if allowed.is_empty() {
            return Err(EngineError::BeamCollapsed {
                node: node.name().to_string(),
            });
        }
        let uniform = 1.0 / allowed.len() as f64;
        pairs = allowed.iter().map(|v| (v.clone(), uniform)).collect();
    } else {
        for (_, prob) in &mut pairs {
            *prob /= mass;
        }
    }

    let borrowed: Vec<(&str, f64)> = pairs.iter().map(|(v, p)| (v.as_str(), *p)).collect();
    draw(rng, &borrowed).ok_or_else(|| EngineError::BeamCollapsed {
        node: node.name().to_string(),
    })
}

/// Draw one value from a distribution: uniform anchor in `[0, 1)`, then a
/// cumulative walk. Numerical underflow lands on the last value.
fn draw<R: Rng>(rng: &mut R, pairs: &[(&str, f64)]) -> Option<String> {
    let anchor: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (value, prob) in pairs {
        cumulative += prob;
        if cumulative > anchor {
            return Some((*value).to_string());
        }
    }
    pairs.last().map(|(value, _)| (*value).to_string())
}
