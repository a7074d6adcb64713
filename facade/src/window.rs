//! Window-size constraints.
//!
//! A convenience over raw constraints: bound the generated window's outer
//! dimensions and the compiler narrows the `window` node to the sizes
//! that fit.

use indexmap::IndexSet;
use serde_json::Value;

use facade_engine::Evidence;
use facade_model::Model;

use crate::error::{Error, Result};
use crate::paths::node_possibilities;

/// Bounds on the generated window's outer size. At least one field must
/// be set for the filter to do anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowBounds {
    /// Lower bound width.
    pub min_width: Option<u32>,
    /// Upper bound width.
    pub max_width: Option<u32>,
    /// Lower bound height.
    pub min_height: Option<u32>,
    /// Upper bound height.
    pub max_height: Option<u32>,
}

impl WindowBounds {
    /// True if any bound was set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.min_width.is_some()
            || self.max_width.is_some()
            || self.min_height.is_some()
            || self.max_height.is_some()
    }

    /// Reject inverted ranges.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidWindowBounds`] when a min exceeds its max.
    pub fn validate(&self) -> Result<()> {
        let inverted = |min: Option<u32>, max: Option<u32>| match (min, max) {
            (Some(min), Some(max)) => min > max,
            _ => false,
        };
        if inverted(self.min_width, self.max_width) || inverted(self.min_height, self.max_height) {
            return Err(Error::InvalidWindowBounds(
                "min values cannot be greater than max values".into(),
            ));
        }
        Ok(())
    }

    fn admits(&self, width: f64, height: f64) -> bool {
        width >= self.min_width.map_or(0.0, f64::from)
            && width <= self.max_width.map_or(f64::INFINITY, f64::from)
            && height >= self.min_height.map_or(0.0, f64::from)
            && height <= self.max_height.map_or(f64::INFINITY, f64::from)
    }
}

/// Narrow the `window` node to sizes within `bounds`.
///
/// In strict mode an empty result is an error; otherwise the bounds are
/// dropped and the node left unconstrained.
///
/// # Errors
///
/// [`Error::InvalidWindowBounds`] for inverted or unsatisfiable bounds;
/// [`Error::InvalidNode`] when the network has no `window` node.
pub(crate) fn apply_window_bounds(
    model: &Model,
    bounds: &WindowBounds,
    evidence: &mut Evidence,
    strict: bool,
) -> Result<()> {
    if !bounds.is_set() {
        return Ok(());
    }
    bounds.validate()?;

    let possibilities = node_possibilities(model, "window", false)?
        .ok_or_else(|| Error::InvalidNode("window".to_string()))?;

    let mut matched: IndexSet<String> = IndexSet::new();
    for (raw, token) in &possibilities {
        let value: Value = serde_json::from_str(raw)?;
        let size = value.as_object().and_then(|map| {
            let width = map.get("outerwidth").and_then(Value::as_f64)?;
            let height = map.get("outerheight").and_then(Value::as_f64)?;
            Some((width, height))
        });
        if let Some((width, height)) = size {
            if bounds.admits(width, height) {
                matched.insert(token.clone());
            }
        }
    }

    // Respect any window evidence the caller already compiled.
    if let Some(existing) = evidence.get("window") {
        let kept: Vec<String> = existing
            .iter()
            .filter(|t| matched.contains(*t))
            .cloned()
            .collect();
        matched = kept.into_iter().collect();
    }

    if matched.is_empty() {
        if strict {
            return Err(Error::InvalidWindowBounds(
                "no known window size satisfies the bounds".into(),
            ));
        }
        log::warn!("window bounds admit no size; dropping them");
        return Ok(());
    }
    evidence.allow("window", matched);
    Ok(())
}
