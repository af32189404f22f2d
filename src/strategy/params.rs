//! Strategy parameter sets and search grids
//!
//! Parameter sets are opaque to the engine; strategies interpret them at
//! construction. Both containers are BTreeMap-backed so iteration order is
//! the lexicographic key order, which makes grid enumeration (and therefore
//! the best-of-grid tie-break) deterministic.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    /// Text value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Number(_) => None,
            ParamValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One named parameter assignment per grid-search combination
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Numeric parameter lookup
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    /// Numeric parameter lookup, truncated to an index/size
    pub fn get_usize(&self, name: &str) -> Option<usize> {
        let v = self.get_f64(name)?;
        if v >= 0.0 {
            Some(v as usize)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries in lexicographic name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Numeric entries only, in lexicographic name order
    pub fn numeric_entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.as_str(), n)))
    }
}

/// Candidate values per parameter axis for grid search
#[derive(Debug, Clone, Default)]
pub struct ParameterGrid {
    axes: BTreeMap<String, Vec<ParamValue>>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis with its candidate values (declared order is preserved)
    pub fn axis<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.axes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() || self.axes.values().any(|v| v.is_empty())
    }

    /// Cartesian product of all axes
    ///
    /// Axes are expanded in lexicographic name order and values in declared
    /// order, so the combination index is a stable total order over the grid.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut combos = vec![ParameterSet::new()];
        for (name, values) in &self.axes {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in values {
                    let mut set = combo.clone();
                    set.insert(name.clone(), value.clone());
                    next.push(set);
                }
            }
            combos = next;
        }
        combos
    }
}
