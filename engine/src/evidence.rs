//! Compiled evidence: per-node allowed-value token sets.

use indexmap::{IndexMap, IndexSet};

/// Evidence against the network: node name → non-empty set of allowed
/// value-index tokens.
///
/// Keys are stored case-folded, so lookups by a node's folded name never
/// re-fold. Insertion order is preserved because relaxation discards
/// entries front-to-back (the first constraint the caller supplied is the
/// first one sacrificed). Built fresh per call; a `Generator`'s cached
/// evidence is cloned, never shared.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    entries: IndexMap<String, IndexSet<String>>,
}

impl Evidence {
    /// Empty evidence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a node to a single token. Replaces any existing entry.
    pub fn fix(&mut self, node: &str, token: impl Into<String>) {
        let mut set = IndexSet::with_capacity(1);
        set.insert(token.into());
        self.entries.insert(node.to_lowercase(), set);
    }

    /// Allow a set of tokens for a node. Replaces any existing entry.
    /// Empty sets are ignored — evidence sets are non-empty by contract.
    pub fn allow<I, S>(&mut self, node: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: IndexSet<String> = tokens.into_iter().map(Into::into).collect();
        if !set.is_empty() {
            self.entries.insert(node.to_lowercase(), set);
        }
    }

    /// Allowed tokens for a node, if constrained.
    #[must_use]
    pub fn get(&self, node: &str) -> Option<&IndexSet<String>> {
        if let Some(set) = self.entries.get(node) {
            return Some(set);
        }
        self.entries.get(&node.to_lowercase())
    }

    /// Whether a node is constrained.
    #[must_use]
    pub fn contains(&self, node: &str) -> bool {
        self.get(node).is_some()
    }

    /// Whether a node is pinned to exactly one token.
    #[must_use]
    pub fn is_fixed(&self, node: &str) -> bool {
        self.get(node).is_some_and(|set| set.len() == 1)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexSet<String>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Constrained node names in insertion order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Remove a node's entry, keeping the order of the rest.
    pub fn remove(&mut self, node: &str) -> Option<IndexSet<String>> {
        self.entries.shift_remove(&node.to_lowercase())
    }

    /// Drop the oldest entry (relaxation step). Returns the dropped name.
    pub fn drop_first(&mut self) -> Option<String> {
        self.entries.shift_remove_index(0).map(|(name, _)| name)
    }

    /// Number of constrained nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no nodes are constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
