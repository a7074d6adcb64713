//! Public error taxonomy.
//!
//! Three kinds, all synchronous: user-input errors (bad constraint values,
//! unknown nodes or paths), feasibility errors (evidence that admits no
//! joint assignment), and system errors (model assets missing or
//! malformed). Nothing here is retried internally except non-strict
//! evidence relaxation, which is driven by the `Generator`.

use thiserror::Error;

use facade_engine::EngineError;
use facade_model::ModelError;

/// Everything the public API can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// A constraint value is not admissible under a node's possibilities,
    /// or constraints on the same node contradict each other.
    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),

    /// A key did not resolve to any node in the network.
    #[error("unknown node: '{0}'")]
    InvalidNode(String),

    /// A sub-path inside a node's values does not exist.
    #[error("unknown key path (missing '{segment}')")]
    NodePath { segment: String },

    /// The evidence is jointly infeasible.
    #[error("constraints are too restrictive: {0}")]
    RestrictiveConstraints(String),

    /// Window bounds are inverted or admit no known window size.
    #[error("invalid window bounds: {0}")]
    InvalidWindowBounds(String),

    /// The process-wide model is not available.
    #[error("network unavailable: {0}")]
    Network(String),

    /// Loading or dereferencing model assets failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<serde_json::Error> for Error {
    /// Undecodable stored values are data corruption, not user error.
    fn from(err: serde_json::Error) -> Self {
        Self::Model(ModelError::Json(err))
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::BeamCollapsed { .. } | EngineError::EmptyDomain { .. } => {
                Self::RestrictiveConstraints(err.to_string())
            }
            EngineError::UnknownNode { name } => Self::InvalidNode(name),
            EngineError::BadPolicy { detail } => Self::InvalidConstraints(detail),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
