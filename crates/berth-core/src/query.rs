//! Declarative query expressions and their evaluator.
//!
//! A peer never reads another peer's state directly; it sends a small
//! expression that the receiver evaluates against a context of named values
//! it chooses to expose (`offset`, `bounds`, ...). The expression language
//! is deliberately tiny: named-variable lookup, with `.`-separated paths
//! descending into structured values.
//!
//! Expressions serialize to the same JSON shape they would have as a query
//! document, e.g. `Expr::Var("offset")` is `{"var": "offset"}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A query expression evaluated by the receiving entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expr {
    /// Look up a named value, descending into objects along `.` separators
    /// (`"offset"`, `"offset.left"`).
    Var(String),
}

impl Expr {
    /// Convenience constructor for a variable lookup.
    pub fn var(path: impl Into<String>) -> Self {
        Expr::Var(path.into())
    }
}

/// The named values a receiver exposes to query evaluation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named value, replacing any previous value under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    fn lookup(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        // A path always has at least one segment; an empty path is just an
        // unknown variable.
        let Some(root) = segments.next() else {
            return Value::Null;
        };
        let Some(mut current) = self.values.get(root) else {
            return Value::Null;
        };
        for segment in segments {
            match current.get(segment) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        current.clone()
    }
}

/// Evaluates `expr` against `context`.
///
/// Unknown variables (or paths that run off the end of a value) evaluate to
/// [`Value::Null`], the explicit "undefined" marker, rather than failing.
pub fn evaluate(expr: &Expr, context: &Context) -> Value {
    match expr {
        Expr::Var(path) => context.lookup(path),
    }
}
