//! Typed inference errors.

use thiserror::Error;

/// Failure inside the inference engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The beam policy is unusable (zero width).
    #[error("invalid beam policy: {detail}")]
    BadPolicy { detail: String },

    /// An evidence entry names a node the network does not have.
    #[error("unknown node '{name}' in evidence")]
    UnknownNode { name: String },

    /// A node has no possible values and no table to fall back on.
    #[error("node '{node}' has no possible values")]
    EmptyDomain { node: String },

    /// Every partial assignment reached zero probability at this node —
    /// the evidence is jointly infeasible (or the joint underflowed).
    #[error("beam collapsed at node '{node}': evidence admits no assignment")]
    BeamCollapsed { node: String },
}
