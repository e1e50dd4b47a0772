//! Cut parameter mappings (option name → scalar).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single cut parameter.
///
/// Most parameters are numeric thresholds; a few cuts accept a string
/// sentinel (e.g. `"Inf"` for an open upper bound).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric threshold.
    Number(f64),
    /// String sentinel.
    Text(String),
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
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
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Ordered parameter mapping attached to a cut.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CutParams(BTreeMap<String, ParamValue>);

impl CutParams {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw parameter lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Numeric parameter lookup; missing or non-numeric values are configuration errors.
    pub fn number(&self, key: &str) -> Result<f64> {
        match self.0.get(key) {
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(ParamValue::Text(s)) => Err(Error::Config(format!(
                "parameter '{key}' must be numeric, got \"{s}\""
            ))),
            None => Err(Error::Config(format!("missing parameter '{key}'"))),
        }
    }

    /// Numeric parameter interpreted as a non-negative count.
    pub fn count(&self, key: &str) -> Result<usize> {
        let v = self.number(key)?;
        if !(v >= 0.0 && v.fract() == 0.0) {
            return Err(Error::Config(format!(
                "parameter '{key}' must be a non-negative integer, got {v}"
            )));
        }
        Ok(v as usize)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for CutParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for CutParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_lookup() {
        let p = CutParams::new().with("njet", 4).with("pt_high", "Inf");
        assert_eq!(p.number("njet").unwrap(), 4.0);
        assert_eq!(p.count("njet").unwrap(), 4);
        assert!(matches!(p.number("pt_high"), Err(Error::Config(_))));
        assert!(matches!(p.number("missing"), Err(Error::Config(_))));
    }

    #[test]
    fn count_rejects_fractional() {
        let p = CutParams::new().with("njet", 2.5);
        assert!(p.count("njet").is_err());
    }

    #[test]
    fn yaml_mixed_values() {
        let p: CutParams = serde_yaml_ng::from_str("pt_low: 30\npt_high: \"Inf\"\n").unwrap();
        assert_eq!(p.get("pt_low"), Some(&ParamValue::Number(30.0)));
        assert_eq!(p.get("pt_high"), Some(&ParamValue::Text("Inf".into())));
        assert_eq!(p.to_string(), "{pt_high: \"Inf\", pt_low: 30}");
    }
}
