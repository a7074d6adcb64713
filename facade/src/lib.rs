//! Facade: realistic synthetic browser fingerprints from a learned
//! Bayesian network.
//!
//! The crate samples full, internally consistent fingerprints — OS,
//! browser, screen and window geometry, navigator fields, GPU strings,
//! header orderings — from a network of ~100 correlated variables, and
//! answers inference questions about it: the marginal distribution of
//! any attribute under partial evidence (`trace`), or the plain
//! possibility list of any attribute (`query`).
//!
//! # Crate dependency graph
//!
//! ```text
//! facade-model  ←  facade-engine  ←  facade
//! (network, CPTs,   (beam search,     (constraints, query,
//!  value store)      sampling)         Generator)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use facade::{ConstraintMap, GenerateRequest, Generator, Model};
//!
//! # fn main() -> Result<(), facade::Error> {
//! let model = Arc::new(Model::open(Path::new("data"))?);
//! let generator = Generator::new(model);
//!
//! // A full fingerprint consistent with the constraints.
//! let fingerprint = generator.generate_with(
//!     GenerateRequest::new()
//!         .constraints(ConstraintMap::new().set("browser", "Firefox")),
//! )?;
//!
//! // The marginal of one attribute under the same model.
//! let distribution = generator.trace("os")?;
//! # let _ = (fingerprint, distribution);
//! # Ok(())
//! # }
//! ```
//!
//! Constraint keys resolve case-insensitively to network nodes, dotted
//! keys reach inside structured values (`screen.width`), arrays are
//! disjunctions, and predicates run against decoded JSON values. Strict
//! mode (the default) raises [`Error::RestrictiveConstraints`] on
//! jointly-infeasible evidence; non-strict generation relaxes
//! constraints front-to-back instead.

#![forbid(unsafe_code)]

pub mod constraints;
pub mod error;
pub mod generator;
pub mod trace;
pub mod window;

mod compile;
mod paths;
mod query;
mod shape;

pub use constraints::{Constraint, ConstraintMap, Predicate};
pub use error::{Error, Result};
pub use generator::{
    default_model, generate, install_default_model, query, trace, GenerateRequest, Generator,
    GeneratorBuilder, TraceRequest,
};
pub use trace::{TraceResult, TraceTree};
pub use window::WindowBounds;

pub use facade_engine::{BeamPolicy, Evidence};
pub use facade_model::{Model, ModelError, Network};
