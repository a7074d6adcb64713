//! Facade Model: the loaded fingerprint network and its value dictionary.
//!
//! This crate owns everything that exists before a query runs: the
//! serialized Bayesian network (`fingerprint-network.json`), the
//! out-of-band value dictionary (`values.json` + `values.dat`), and the
//! typed node/CPT structures the inference layer walks. It depends on
//! nothing internal — `facade-engine` and `facade` build on top of it.
//!
//! # Crate dependency graph
//!
//! ```text
//! facade-model  ←  facade-engine  ←  facade
//! (network, CPTs,   (beam search,     (constraints, query,
//!  value store)      sampling)         Generator)
//! ```
//!
//! # Key types
//!
//! - [`Network`] — nodes in sampling order, case-insensitive name index,
//!   memoized ancestor closures
//! - [`Node`] — a discrete variable with its compressed CPT
//! - [`ValueStore`] — random-access token → JSON-string dictionary
//! - [`Model`] — a loaded network/store pair resolved from a directory
//!
//! A loaded [`Network`] is immutable and safe to share across threads;
//! all per-query state lives in the layers above.

#![forbid(unsafe_code)]

pub mod assets;
pub mod error;
pub mod network;
pub mod node;
pub mod token;
pub mod values;

pub use assets::Model;
pub use error::ModelError;
pub use network::Network;
pub use node::{Cpt, CptLeaf, Node};
pub use values::ValueStore;
