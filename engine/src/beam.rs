//! Beam-search marginalization.
//!
//! Partial assignments are prefix vectors aligned with the relevant-node
//! slice: the relevant set is closed under parents and sorted by
//! topological index, so when node *k* expands, every parent already has
//! a slot below *k*. This keeps beam entries flat and clone-cheap instead
//! of carrying per-entry maps.

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};

use facade_model::node::CptLeaf;
use facade_model::Network;

use crate::error::EngineError;
use crate::evidence::Evidence;
use crate::policy::BeamPolicy;

/// A partial assignment (tokens for the relevant prefix) and its joint
/// probability. Probabilities are strictly positive by construction.
type BeamEntry<'m> = (Vec<&'m str>, f64);

/// Compute the approximate conditional marginal of `target` (a sampling-
/// order position) given `evidence`.
///
/// Runs beam search over `ancestors(target) ∪ {target}` plus every
/// evidence node and its ancestors, in topological order, then sums the
/// surviving joint probabilities by target value and renormalizes.
///
/// # Errors
///
/// - [`EngineError::UnknownNode`] — evidence names a node that does not
///   exist (compiled evidence should never do this).
/// - [`EngineError::EmptyDomain`] — a relevant node has neither possible
///   values nor table entries.
/// - [`EngineError::BeamCollapsed`] — no assignment survives some step:
///   the evidence is jointly infeasible, or the joint underflowed.
pub fn marginal(
    network: &Network,
    target: usize,
    evidence: &Evidence,
    policy: &BeamPolicy,
) -> Result<IndexMap<String, f64>, EngineError> {
    policy.validate()?;

    let relevant = relevant_nodes(network, target, evidence)?;
    let slots: HashMap<usize, usize> = relevant
        .iter()
        .enumerate()
        .map(|(slot, &index)| (index, slot))
        .collect();

    // CPT lookups repeat heavily across beam entries; memoize per call.
    let mut memo: HashMap<(usize, Vec<&str>), Option<&CptLeaf>> = HashMap::new();
    let mut beam: Vec<BeamEntry<'_>> = vec![(Vec::new(), 1.0)];

    for &node_index in &relevant {
        let node = network.node_at(node_index);
        let allowed = evidence.get(node.folded_name());
        let parent_slots: Vec<usize> = node
            .parent_names()
            .iter()
            .filter_map(|p| network.index_of(p).map(|i| slots[&i]))
            .collect();

        let mut next: Vec<BeamEntry<'_>> = Vec::new();
        for (assignment, joint) in &beam {
            let parent_tokens: Vec<&str> =
                parent_slots.iter().map(|&slot| assignment[slot]).collect();
            let leaf = *memo
                .entry((node_index, parent_tokens.clone()))
                .or_insert_with(|| {
                    let mut walk = parent_tokens.iter();
                    node.probabilities_given(|_| walk.next().copied())
                });

            match leaf.filter(|l| !l.is_empty()) {
                Some(leaf) => {
                    for (value, &prob) in leaf {
                        if prob <= 0.0 || !admits(allowed, value) {
                            continue;
                        }
                        push_grown(&mut next, assignment, value, joint * prob);
                    }
                }
                // No information for this parent path: uniform over the
                // node's full possibility list.
                None => {
                    let values = node.possible_values();
                    if values.is_empty() {
                        return Err(EngineError::EmptyDomain {
                            node: node.name().to_string(),
                        });
                    }
                    let prob = 1.0 / values.len() as f64;
                    for value in values {
                        if !admits(allowed, value) {
                            continue;
                        }
                        push_grown(&mut next, assignment, value, joint * prob);
                    }
                }
            }
        }

        if next.len() > policy.beam_width {
            // Stable sort: ties keep expansion order, so pruning is
            // deterministic for a given network and evidence.
            next.sort_by(|a, b| b.1.total_cmp(&a.1));
            next.truncate(policy.beam_width);
        }
        if next.is_empty() {
            log::warn!("beam collapsed at node '{}'", node.name());
            return Err(EngineError::BeamCollapsed {
                node: node.name().to_string(),
            });
        }
        beam = next;
    }

    let target_slot = slots[&target];
    let mut sums: IndexMap<String, f64> = IndexMap::new();
    let mut total = 0.0;
    for (assignment, joint) in beam {
        *sums.entry(assignment[target_slot].to_string()).or_insert(0.0) += joint;
        total += joint;
    }
    for prob in sums.values_mut() {
        *prob /= total;
    }
    Ok(sums)
}

/// The relevant-node set for a query, sorted by topological index:
/// target and its ancestors, plus every evidence node and its ancestors
/// (so the beam actually conditions on them).
fn relevant_nodes(
    network: &Network,
    target: usize,
    evidence: &Evidence,
) -> Result<Vec<usize>, EngineError> {
    let mut set: BTreeSet<usize> = BTreeSet::new();
    set.insert(target);
    set.extend(network.ancestors(target));
    for (name, _) in evidence.iter() {
        let index = network
            .index_of(name)
            .ok_or_else(|| EngineError::UnknownNode {
                name: name.to_string(),
            })?;
        set.insert(index);
        set.extend(network.ancestors(index));
    }
    Ok(set.into_iter().collect())
}

fn admits(allowed: Option<&IndexSet<String>>, value: &str) -> bool {
    allowed.map_or(true, |set| set.contains(value))
}

fn push_grown<'m>(
    next: &mut Vec<BeamEntry<'m>>,
    assignment: &[&'m str],
    value: &'m str,
    joint: f64,
) {
    if joint <= 0.0 {
        return; // underflow; the entry would only pollute the beam
    }
    let mut grown = Vec::with_capacity(assignment.len() + 1);
    grown.extend_from_slice(assignment);
    grown.push(value);
    next.push((grown, joint));
}
