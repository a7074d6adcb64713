//! Node and compressed-CPT types.

use indexmap::IndexMap;
use serde::Deserialize;

/// Leaf layer of a CPT: value-index token → probability.
pub type CptLeaf = IndexMap<String, f64>;

/// A compressed conditional probability table.
///
/// With *k* parents the table nests *k* levels of [`Cpt::Branch`] keyed by
/// parent-value tokens, ending in a [`Cpt::Leaf`]. Parent order follows the
/// node's declared `parentNames`. A missing parent path means "no
/// information"; callers re-fill with a uniform distribution.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Cpt {
    /// An interior layer keyed by a parent's value token.
    Branch(IndexMap<String, Cpt>),
    /// The final layer: this node's distribution.
    Leaf(CptLeaf),
}

impl Default for Cpt {
    fn default() -> Self {
        Self::Branch(IndexMap::new())
    }
}

/// Serialized node definition, as it appears in the network file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
    pub name: String,
    #[serde(default)]
    pub parent_names: Vec<String>,
    #[serde(default)]
    pub possible_values: Vec<String>,
    #[serde(default)]
    pub conditional_probabilities: Cpt,
}

/// A discrete variable in the network.
///
/// Names compare case-insensitively; the folded form is computed once at
/// load so lookups never re-fold.
#[derive(Debug)]
pub struct Node {
    name: String,
    folded: String,
    parent_names: Vec<String>,
    possible_values: Vec<String>,
    cpt: Cpt,
    index: usize,
}

impl Node {
    pub(crate) fn new(def: NodeDef, index: usize) -> Self {
        let folded = def.name.to_lowercase();
        Self {
            name: def.name,
            folded,
            parent_names: def.parent_names,
            possible_values: def.possible_values,
            cpt: def.conditional_probabilities,
            index,
        }
    }

    /// Display name, original case preserved.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-folded name used for matching.
    #[must_use]
    pub fn folded_name(&self) -> &str {
        &self.folded
    }

    /// Parent names in CPT nesting order.
    #[must_use]
    pub fn parent_names(&self) -> &[String] {
        &self.parent_names
    }

    /// Value-index tokens this node can take, in declared order.
    #[must_use]
    pub fn possible_values(&self) -> &[String] {
        &self.possible_values
    }

    /// Position in the network's sampling order.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw conditional probability table.
    #[must_use]
    pub fn cpt(&self) -> &Cpt {
        &self.cpt
    }

    /// Walk the CPT by parent values and return the matching leaf.
    ///
    /// `parent_value` supplies the token assigned to each parent name.
    /// Any miss along the path — an unassigned parent, an unknown parent
    /// token, or a table shallower than the parent list — yields `None`
    /// ("no information"). Callers uniformly re-fill `None` with an even
    /// distribution over [`Node::possible_values`].
    pub fn probabilities_given<'v, F>(&self, mut parent_value: F) -> Option<&CptLeaf>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        let mut layer = &self.cpt;
        for parent in &self.parent_names {
            let value = parent_value(parent)?;
            match layer {
                Cpt::Branch(map) => layer = map.get(value)?,
                Cpt::Leaf(_) => return None,
            }
        }
        match layer {
            Cpt::Leaf(leaf) => Some(leaf),
            Cpt::Branch(_) => None,
        }
    }
}
