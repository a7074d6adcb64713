//! User-supplied constraint trees.
//!
//! Constraints arrive as a nested, insertion-ordered mapping whose leaves
//! are scalars (equality), arrays (disjunctive allow-lists), predicates
//! over the decoded JSON value, or further nesting. Before matching, the
//! tree is flattened by joining keys with `.` and JSON-encoding data
//! leaves — node possibilities are stored as JSON strings, so the encoded
//! form is the normalized one.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

/// A predicate over a decoded node value. Never serialized.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// One constraint leaf (or subtree).
#[derive(Clone)]
pub enum Constraint {
    /// Structural equality with a single value.
    Value(Value),
    /// Any of several values (disjunction).
    AnyOf(Vec<Value>),
    /// Admit values for which the predicate returns true.
    Where(Predicate),
    /// Descend into a nested field.
    Nested(ConstraintMap),
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::AnyOf(vs) => f.debug_tuple("AnyOf").field(vs).finish(),
            Self::Where(_) => f.write_str("Where(<predicate>)"),
            Self::Nested(map) => f.debug_tuple("Nested").field(map).finish(),
        }
    }
}

impl From<Value> for Constraint {
    /// JSON objects become nested constraint maps and arrays become
    /// allow-lists; everything else is an equality constraint. Use
    /// [`ConstraintMap::equals`] to compare against a literal array or
    /// object instead.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let mut nested = ConstraintMap::new();
                for (key, value) in map {
                    nested.entries.insert(key, Self::from(value));
                }
                Self::Nested(nested)
            }
            Value::Array(values) => Self::AnyOf(values),
            other => Self::Value(other),
        }
    }
}

/// An insertion-ordered constraint mapping.
///
/// Order matters: when non-strict generation has to relax evidence, the
/// earliest-inserted constraint is sacrificed first.
#[derive(Clone, Default, Debug)]
pub struct ConstraintMap {
    entries: IndexMap<String, Constraint>,
}

impl ConstraintMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, interpreting arrays as allow-lists and
    /// objects as nesting.
    ///
    /// # Errors
    ///
    /// Returns the offending value's rendering when `value` is not an
    /// object.
    pub fn from_json(value: Value) -> Result<Self, crate::error::Error> {
        match Constraint::from(value) {
            Constraint::Nested(map) => Ok(map),
            other => Err(crate::error::Error::InvalidConstraints(format!(
                "constraints must be a mapping, got {other:?}"
            ))),
        }
    }

    /// Constrain `key` by a value, with array/object interpretation as in
    /// [`Constraint::from`].
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), Constraint::from(value.into()));
        self
    }

    /// Constrain `key` to equal a literal value, with no array/object
    /// reinterpretation.
    #[must_use]
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), Constraint::Value(value.into()));
        self
    }

    /// Constrain `key` to any of the given values.
    #[must_use]
    pub fn any_of<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.entries.insert(
            key.into(),
            Constraint::AnyOf(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Constrain `key` by a predicate over the decoded value.
    #[must_use]
    pub fn matching<F>(mut self, key: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.entries
            .insert(key.into(), Constraint::Where(Arc::new(predicate)));
        self
    }

    /// Attach a nested constraint map under `key`.
    #[must_use]
    pub fn nested(mut self, key: impl Into<String>, map: Self) -> Self {
        self.entries.insert(key.into(), Constraint::Nested(map));
        self
    }

    /// Whether no constraints are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Flatten to `(dotted key, leaf)` pairs in insertion order.
    pub(crate) fn flatten(&self) -> Vec<(String, FlatLeaf)> {
        let mut out = Vec::new();
        flatten_into("", &self.entries, &mut out);
        out
    }
}

/// A flattened constraint leaf, normalized for matching.
pub(crate) enum FlatLeaf {
    /// Candidate values, kept both parsed (structural comparison) and
    /// JSON-encoded (direct possibility lookup).
    Candidates(Vec<Value>),
    /// A predicate, preserved as-is.
    Predicate(Predicate),
}

fn flatten_into(prefix: &str, entries: &IndexMap<String, Constraint>, out: &mut Vec<(String, FlatLeaf)>) {
    for (key, constraint) in entries {
        let flat_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match constraint {
            Constraint::Nested(map) => flatten_into(&flat_key, &map.entries, out),
            Constraint::Value(value) => {
                out.push((flat_key, FlatLeaf::Candidates(vec![value.clone()])));
            }
            Constraint::AnyOf(values) => {
                out.push((flat_key, FlatLeaf::Candidates(values.clone())));
            }
            Constraint::Where(predicate) => {
                out.push((flat_key, FlatLeaf::Predicate(Arc::clone(predicate))));
            }
        }
    }
}
