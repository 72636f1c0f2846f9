//! Named design parameters.
//!
//! Parameters are the free variables of dimension expressions: a
//! keyed list of `{key, value, unit}` entries resolved to millimeters
//! before evaluation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::units::Unit;

/// One named parameter as authored by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Unit,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            unit: Unit::Millimeters,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// The parameter value converted to millimeters.
    pub fn value_mm(&self) -> f64 {
        self.unit.to_mm(self.value)
    }
}

/// The full parameter table handed to every expression evaluation.
///
/// Lookups are by key; duplicate keys keep the last inserted value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSet {
    entries: BTreeMap<String, Parameter>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(params: impl IntoIterator<Item = Parameter>) -> Self {
        let mut set = Self::new();
        for p in params {
            set.insert(p);
        }
        set
    }

    pub fn insert(&mut self, param: Parameter) {
        self.entries.insert(param.key.clone(), param);
    }

    /// Resolved millimeter value for a parameter key.
    pub fn get_mm(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|p| p.value_mm())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.values()
    }
}
