//! The public generation surface.
//!
//! A [`Generator`] wraps a loaded model with compiled base evidence and
//! default flags. Per-call constraints merge into a *copy* of that
//! evidence, so concurrent calls never observe each other. The free
//! [`generate`], [`trace`] and [`query`] functions run against a
//! process-wide model installed once via [`install_default_model`].

use std::sync::{Arc, OnceLock};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use facade_engine::{full_sample, targeted_sample, BeamPolicy, EngineError, Evidence};
use facade_model::Model;

use crate::compile::{assert_feasible, compile_into};
use crate::constraints::ConstraintMap;
use crate::error::{Error, Result};
use crate::paths::{find_roots, reassemble_targets};
use crate::query::run_query;
use crate::shape::{flatten_value, make_output};
use crate::trace::{trace_roots, TraceResult, TraceTree};
use crate::window::{apply_window_bounds, WindowBounds};

/// Options for one `generate` call. Unset flags inherit the generator's.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    constraints: ConstraintMap,
    targets: Vec<String>,
    strict: Option<bool>,
    flatten: Option<bool>,
    window: Option<WindowBounds>,
    seed: Option<u64>,
}

impl GenerateRequest {
    /// An empty request: full fingerprint, generator defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraints for this call, merged over the generator's.
    #[must_use]
    pub fn constraints(mut self, constraints: ConstraintMap) -> Self {
        self.constraints = constraints;
        self
    }

    /// Generate only this target (and anything it depends on). May be
    /// called repeatedly to add targets.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Override the generator's strictness for this call.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Override the generator's flatten flag for this call.
    #[must_use]
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = Some(flatten);
        self
    }

    /// Constrain the window size for this call.
    #[must_use]
    pub fn window(mut self, bounds: WindowBounds) -> Self {
        self.window = Some(bounds);
        self
    }

    /// Seed the sampler for a deterministic draw.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Options for one `trace` call.
#[derive(Debug, Clone, Default)]
pub struct TraceRequest {
    constraints: ConstraintMap,
    flatten: bool,
}

impl TraceRequest {
    /// An empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraints for this call, merged over the generator's.
    #[must_use]
    pub fn constraints(mut self, constraints: ConstraintMap) -> Self {
        self.constraints = constraints;
        self
    }

    /// Return multi-root results as a flat `root name → distribution` map
    /// instead of a nested tree.
    #[must_use]
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }
}

/// Generates fingerprints and answers trace/query requests against one
/// loaded model.
#[derive(Debug)]
pub struct Generator {
    model: Arc<Model>,
    base_evidence: Evidence,
    window: Option<WindowBounds>,
    strict: bool,
    flatten: bool,
    policy: BeamPolicy,
}

/// Configures a [`Generator`]; base constraints compile at build time.
#[derive(Debug)]
pub struct GeneratorBuilder {
    model: Arc<Model>,
    constraints: ConstraintMap,
    window: Option<WindowBounds>,
    strict: bool,
    flatten: bool,
    policy: BeamPolicy,
}

impl GeneratorBuilder {
    /// Base constraints applied to every call.
    #[must_use]
    pub fn constraints(mut self, constraints: ConstraintMap) -> Self {
        self.constraints = constraints;
        self
    }

    /// Default window bounds.
    #[must_use]
    pub fn window(mut self, bounds: WindowBounds) -> Self {
        self.window = Some(bounds);
        self
    }

    /// Whether infeasible constraints raise instead of relaxing.
    /// Default: `true`.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether outputs are flattened to dotted keys. Default: `false`.
    #[must_use]
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// Override the beam width.
    #[must_use]
    pub fn beam_width(mut self, beam_width: usize) -> Self {
        self.policy = BeamPolicy { beam_width };
        self
    }

    /// Compile the base constraints and build the generator.
    ///
    /// # Errors
    ///
    /// Invalid base constraints surface here, not at call time.
    pub fn build(self) -> Result<Generator> {
        self.policy.validate().map_err(Error::from)?;
        let mut base_evidence = Evidence::new();
        compile_into(&self.model, &self.constraints, &mut base_evidence)?;
        Ok(Generator {
            model: self.model,
            base_evidence,
            window: self.window,
            strict: self.strict,
            flatten: self.flatten,
            policy: self.policy,
        })
    }
}

impl Generator {
    /// A generator with no base constraints and default flags.
    #[must_use]
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            base_evidence: Evidence::new(),
            window: None,
            strict: true,
            flatten: false,
            policy: BeamPolicy::default(),
        }
    }

    /// Start configuring a generator.
    #[must_use]
    pub fn builder(model: Arc<Model>) -> GeneratorBuilder {
        GeneratorBuilder {
            model,
            constraints: ConstraintMap::new(),
            window: None,
            strict: true,
            flatten: false,
            policy: BeamPolicy::default(),
        }
    }

    /// The model this generator runs against.
    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Generate a full fingerprint with the generator's defaults.
    ///
    /// # Errors
    ///
    /// See [`Generator::generate_with`].
    pub fn generate(&self) -> Result<Value> {
        self.generate_with(GenerateRequest::new())
    }

    /// Generate a fingerprint (or targeted subset) under constraints.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConstraints`] / [`Error::InvalidNode`] for bad
    /// input; [`Error::RestrictiveConstraints`] when evidence is jointly
    /// infeasible (in strict mode) or relaxation runs out of entries.
    pub fn generate_with(&self, request: GenerateRequest) -> Result<Value> {
        let strict = request.strict.unwrap_or(self.strict);
        let flatten = request.flatten.unwrap_or(self.flatten);
        let window = request.window.or(self.window);

        let mut evidence = self.base_evidence.clone();
        compile_into(&self.model, &request.constraints, &mut evidence)?;
        if let Some(bounds) = &window {
            apply_window_bounds(&self.model, bounds, &mut evidence, strict)?;
        }

        // Pre-flight feasibility; non-strict mode relaxes front-to-back.
        loop {
            match assert_feasible(&self.model, &evidence, &self.policy) {
                Ok(()) => break,
                Err(err) if !strict => match evidence.drop_first() {
                    Some(dropped) => log::warn!("relaxing evidence: dropped '{dropped}'"),
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }

        let roots = if request.targets.is_empty() {
            None
        } else {
            Some(find_roots(self.model.network(), &request.targets)?)
        };

        let mut rng = request
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let sample = loop {
            let attempt = match &roots {
                Some(roots) => {
                    let indices: Vec<usize> = roots
                        .iter()
                        .filter_map(|r| self.model.network().index_of(r))
                        .collect();
                    targeted_sample(
                        self.model.network(),
                        &evidence,
                        &indices,
                        &self.policy,
                        &mut rng,
                    )
                }
                None => full_sample(self.model.network(), &evidence, &self.policy, &mut rng),
            };
            match attempt {
                Ok(sample) => break sample,
                Err(err @ EngineError::BeamCollapsed { .. }) => {
                    if strict || evidence.drop_first().is_none() {
                        return Err(err.into());
                    }
                    log::warn!("sample infeasible; relaxing evidence");
                }
                Err(other) => return Err(other.into()),
            }
        };

        match roots {
            None => make_output(sample, self.model.values(), flatten),
            Some(_) => {
                let assembled = make_output(sample, self.model.values(), false)?;
                let mut picked = reassemble_targets(&request.targets, &assembled)?;
                // A single requested target yields its value directly.
                if picked.len() == 1 {
                    if let Some((_, value)) = picked.swap_remove_index(0) {
                        if flatten {
                            return Ok(flatten_value(&value));
                        }
                        return Ok(value);
                    }
                }
                let object = Value::Object(picked.into_iter().collect());
                if flatten {
                    return Ok(flatten_value(&object));
                }
                Ok(object)
            }
        }
    }

    /// The marginal distribution of a single target under the
    /// generator's base constraints.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConstraints`] when the target spans more than one
    /// node — use [`Generator::trace_with`] for prefixes.
    pub fn trace(&self, target: &str) -> Result<Vec<TraceResult>> {
        match self.trace_with(&[target], TraceRequest::new())? {
            TraceTree::Distribution(dist) => Ok(dist),
            TraceTree::Branch(_) => Err(Error::InvalidConstraints(format!(
                "'{target}' resolves to several nodes; trace it with trace_with"
            ))),
        }
    }

    /// Marginal distributions for one or more targets under merged
    /// constraints.
    ///
    /// # Errors
    ///
    /// Same input errors as `generate_with`;
    /// [`Error::RestrictiveConstraints`] when the evidence admits no
    /// assignment (trace never relaxes).
    pub fn trace_with<S: AsRef<str>>(
        &self,
        targets: &[S],
        request: TraceRequest,
    ) -> Result<TraceTree> {
        let mut evidence = self.base_evidence.clone();
        compile_into(&self.model, &request.constraints, &mut evidence)?;
        assert_feasible(&self.model, &evidence, &self.policy)?;

        let roots = find_roots(self.model.network(), targets)?;
        trace_roots(&self.model, &roots, &evidence, &self.policy, request.flatten)
    }

    /// Possible values of a target (node, sub-path, or prefix).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] / [`Error::NodePath`] for unknown targets.
    pub fn query(&self, target: &str) -> Result<Value> {
        self.query_with(target, false, false)
    }

    /// [`Generator::query`] with explicit output shaping flags.
    ///
    /// # Errors
    ///
    /// Same as [`Generator::query`].
    pub fn query_with(&self, target: &str, flatten: bool, sort: bool) -> Result<Value> {
        run_query(&self.model, target, flatten, sort)
    }
}

static DEFAULT_MODEL: OnceLock<Arc<Model>> = OnceLock::new();

/// Install the process-wide model used by the free functions. One-shot:
/// a second call returns the model back untouched.
///
/// # Errors
///
/// The rejected model, when one is already installed.
pub fn install_default_model(model: Arc<Model>) -> std::result::Result<(), Arc<Model>> {
    DEFAULT_MODEL.set(model)
}

/// The installed process-wide model.
///
/// # Errors
///
/// [`Error::Network`] when no model has been installed.
pub fn default_model() -> Result<Arc<Model>> {
    DEFAULT_MODEL.get().cloned().ok_or_else(|| {
        Error::Network("no model installed; call install_default_model first".into())
    })
}

/// Generate against the process-wide model.
///
/// # Errors
///
/// See [`Generator::generate_with`]; also [`Error::Network`] when no
/// model is installed.
pub fn generate(request: GenerateRequest) -> Result<Value> {
    Generator::new(default_model()?).generate_with(request)
}

/// Trace a single target against the process-wide model.
///
/// # Errors
///
/// See [`Generator::trace`]; also [`Error::Network`] when no model is
/// installed.
pub fn trace(target: &str, request: TraceRequest) -> Result<Vec<TraceResult>> {
    let generator = Generator::new(default_model()?);
    match generator.trace_with(&[target], request)? {
        TraceTree::Distribution(dist) => Ok(dist),
        TraceTree::Branch(_) => Err(Error::InvalidConstraints(format!(
            "'{target}' resolves to several nodes; trace it with Generator::trace_with"
        ))),
    }
}

/// Query possibilities against the process-wide model.
///
/// # Errors
///
/// See [`Generator::query_with`]; also [`Error::Network`] when no model
/// is installed.
pub fn query(target: &str, flatten: bool, sort: bool) -> Result<Value> {
    Generator::new(default_model()?).query_with(target, flatten, sort)
}
