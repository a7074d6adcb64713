//! Facade Engine: approximate inference over the loaded network.
//!
//! One algorithm, two modes. Beam search over the topologically ordered
//! relevant nodes computes conditional marginals ([`beam::marginal`]);
//! the consistent samplers ([`sample::full_sample`],
//! [`sample::targeted_sample`]) walk the sampling order and lean on the
//! same beam search for nodes under evidence.
//!
//! This crate depends only on `facade-model`. It knows nothing about user
//! constraint syntax — evidence arrives pre-compiled as per-node allowed
//! token sets ([`Evidence`]). All state is per-call; a query is sequential
//! and callers parallelize across queries if they need to.

#![forbid(unsafe_code)]

pub mod beam;
pub mod error;
pub mod evidence;
pub mod policy;
pub mod sample;

pub use beam::marginal;
pub use error::EngineError;
pub use evidence::Evidence;
pub use policy::BeamPolicy;
pub use sample::{full_sample, targeted_sample};
