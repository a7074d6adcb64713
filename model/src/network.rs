//! Network loader and ancestor closures.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::assets::read_maybe_zst;
use crate::error::ModelError;
use crate::node::{Node, NodeDef};

#[derive(Debug, Deserialize)]
struct NetworkDef {
    nodes: Vec<NodeDef>,
}

/// The loaded Bayesian network.
///
/// Nodes are held in the file's declared order, which is the sampling
/// (topological) order: every parent precedes its children. The structure
/// is immutable after load and safe to share read-only across threads;
/// ancestor closures memoize into per-node `OnceLock` cells on first use.
#[derive(Debug)]
pub struct Network {
    nodes: Vec<Node>,
    by_folded: HashMap<String, usize>,
    ancestors: Vec<OnceLock<BTreeSet<usize>>>,
}

impl Network {
    /// Load a network from `fingerprint-network.json` (or its `.zst` twin).
    ///
    /// # Errors
    ///
    /// Fails on missing/malformed files and on structural violations:
    /// duplicate case-folded names, unknown parents, or a parent declared
    /// after its child.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = read_maybe_zst(path)?;
        Self::load_from_slice(&raw)
    }

    /// Parse a network from in-memory JSON bytes.
    ///
    /// # Errors
    ///
    /// Same parse/validation failures as [`Network::load`].
    pub fn load_from_slice(raw: &[u8]) -> Result<Self, ModelError> {
        let def: NetworkDef = serde_json::from_slice(raw)?;
        Self::from_defs(def.nodes)
    }

    fn from_defs(defs: Vec<NodeDef>) -> Result<Self, ModelError> {
        let mut nodes = Vec::with_capacity(defs.len());
        let mut by_folded = HashMap::with_capacity(defs.len());

        for (index, def) in defs.into_iter().enumerate() {
            let node = Node::new(def, index);
            if by_folded
                .insert(node.folded_name().to_string(), index)
                .is_some()
            {
                return Err(ModelError::DuplicateNode {
                    name: node.name().to_string(),
                });
            }
            nodes.push(node);
        }

        // Parents must exist and precede their children.
        for node in &nodes {
            for parent in node.parent_names() {
                let Some(&parent_index) = by_folded.get(&parent.to_lowercase()) else {
                    return Err(ModelError::UnknownParent {
                        node: node.name().to_string(),
                        parent: parent.clone(),
                    });
                };
                if parent_index >= node.index() {
                    return Err(ModelError::OrderViolation {
                        node: node.name().to_string(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let ancestors = nodes.iter().map(|_| OnceLock::new()).collect();
        log::debug!("network loaded: {} nodes", nodes.len());
        Ok(Self {
            nodes,
            by_folded,
            ancestors,
        })
    }

    /// Nodes in sampling order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the network has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at a sampling-order position.
    #[must_use]
    pub fn node_at(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index_of(name).map(|i| &self.nodes[i])
    }

    /// Case-insensitive lookup of a node's sampling-order position.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_folded.get(&name.to_lowercase()).copied()
    }

    /// Transitive parent closure of a node, as sampling-order positions.
    ///
    /// Computed on first demand by recursive union over the parents and
    /// memoized; the network stays lock-free on subsequent calls.
    pub fn ancestors(&self, index: usize) -> &BTreeSet<usize> {
        self.ancestors[index].get_or_init(|| {
            let mut closure = BTreeSet::new();
            for parent in self.nodes[index].parent_names() {
                // Parents were validated at load; the lookup cannot miss.
                if let Some(parent_index) = self.index_of(parent) {
                    if closure.insert(parent_index) {
                        closure.extend(self.ancestors(parent_index));
                    }
                }
            }
            closure
        })
    }
}
