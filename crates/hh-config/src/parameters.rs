//! Layered YAML parameter bundles.
//!
//! Later layers override earlier ones key by key; nested mappings are merged
//! recursively, anything else is replaced.

use std::path::Path;

use hh_core::{Error, Result};
use hh_select::{JetMatchingConfig, ObjectPreselection};
use serde::de::DeserializeOwned;
use serde_yaml_ng::{Mapping, Value};

/// Section holding per-object thresholds.
pub const OBJECT_PRESELECTION: &str = "object_preselection";
/// Section holding the jet matching options.
pub const JET_MATCHING: &str = "jet_matching";

/// Merged parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBundle {
    root: Value,
}

impl Default for ParameterBundle {
    fn default() -> Self {
        Self { root: Value::Mapping(Mapping::new()) }
    }
}

impl ParameterBundle {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one YAML layer.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let mut out = Self::new();
        out.merge(serde_yaml_ng::from_str(text)?)?;
        Ok(out)
    }

    /// Merge files in order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut out = Self::new();
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("parameter file {}: {e}", path.display())))?;
            let layer: Value = serde_yaml_ng::from_str(&text)
                .map_err(|e| Error::Config(format!("parameter file {}: {e}", path.display())))?;
            log::debug!("merging parameter layer {}", path.display());
            out.merge(layer)?;
        }
        Ok(out)
    }

    /// Merge one layer on top.
    pub fn merge(&mut self, layer: Value) -> Result<()> {
        match layer {
            Value::Null => Ok(()),
            Value::Mapping(_) => {
                deep_merge(&mut self.root, layer);
                Ok(())
            }
            other => Err(Error::Config(format!("parameter layer must be a mapping, got {other:?}"))),
        }
    }

    /// Value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.root, |v, key| v.get(key))
    }

    /// Deserialize the section at a dotted path.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get(path).ok_or_else(|| Error::Config(format!("missing parameter section '{path}'")))?;
        serde_yaml_ng::from_value(value.clone()).map_err(|e| Error::Config(format!("parameter section '{path}': {e}")))
    }

    /// Per-object thresholds.
    pub fn object_preselection(&self) -> Result<ObjectPreselection> {
        self.section(OBJECT_PRESELECTION)
    }

    /// Matching options; defaults when the section is absent.
    pub fn jet_matching(&self) -> Result<JetMatchingConfig> {
        match self.get(JET_MATCHING) {
            Some(_) => self.section(JET_MATCHING),
            None => Ok(JetMatchingConfig::default()),
        }
    }
}

fn deep_merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Mapping(b), Value::Mapping(l)) => {
            for (k, v) in l {
                match b.get_mut(&k) {
                    Some(slot) => deep_merge(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}
