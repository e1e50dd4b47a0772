//! Analysis documents and their resolution into a runnable [`Analysis`].
//!
//! ```yaml
//! workflow: hh4b
//! parameters: [params/object_preselection.yaml]
//! preselections: [hh4b_presel]
//! categories:
//!   standard_hh4b: {include_2b: true}
//! histograms:
//!   - count: {coll: JetGood, bins: 10, start: 0, stop: 10}
//!   - jets: {coll: JetGood, pos: 0}
//! columns:
//!   - {collection: JetGood, fields: [pt, eta]}
//! weights: {columns: [genWeight], factor: 1.0}
//! ```
//!
//! Every cut name is resolved when the analysis is built, so a typo fails
//! before any chunk is read.

use std::path::{Path, PathBuf};

use hh_core::{CutParams, Error, Result};
use hh_events::EventTable;
use hh_output::{AnalysisOutput, ColOut, HistConf, count_hist, jet_hists, validate_all};
use hh_select::registry::cut_function;
use hh_select::{Categories, Cut, CutRegistry, DerivedFields, JetMatching, Region};
use serde::{Deserialize, Serialize};

use crate::parameters::ParameterBundle;

/// Which derived stage runs before the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    /// Good-object collections and VBF observables for the HH→4b selection.
    #[default]
    Hh4b,
    /// Generator/reco jet matching for response studies.
    JetMatching,
}

/// A user-defined cut added to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CutDefinition {
    /// Registry key.
    pub key: String,
    /// Cut name; defaults to the key.
    #[serde(default)]
    pub name: Option<String>,
    /// Predicate name (see `hh_select::registry::FUNCTIONS`).
    pub function: String,
    /// Predicate parameters.
    #[serde(default)]
    pub params: CutParams,
}

/// One category: a name and the registry keys of its cuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDefinition {
    /// Category name.
    pub name: String,
    /// Registry keys, ANDed.
    #[serde(default)]
    pub cuts: Vec<String>,
}

/// Category layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoriesConfig {
    /// The standard HH→4b layout.
    StandardHh4b {
        /// Add `2b_region`.
        #[serde(default)]
        include_2b: bool,
    },
    /// Explicit categories, in order.
    Custom(Vec<CategoryDefinition>),
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        CategoriesConfig::StandardHh4b { include_2b: false }
    }
}

/// A histogram entry: a full definition or one of the helper sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramEntry {
    /// Explicit histogram.
    Hist(HistConf),
    /// Multiplicity histogram of `n{coll}`.
    Count {
        /// Collection whose count column is histogrammed.
        coll: String,
        /// Number of bins.
        bins: usize,
        /// Lower edge.
        start: f64,
        /// Upper edge.
        stop: f64,
    },
    /// pt/eta/phi/b-tag histograms of a jet collection.
    Jets {
        /// Jet collection.
        coll: String,
        /// Single jet position, or every jet when absent.
        #[serde(default)]
        pos: Option<usize>,
    },
}

impl HistogramEntry {
    fn expand(&self) -> Vec<HistConf> {
        match self {
            HistogramEntry::Hist(h) => vec![h.clone()],
            HistogramEntry::Count { coll, bins, start, stop } => vec![count_hist(coll, *bins, *start, *stop)],
            HistogramEntry::Jets { coll, pos } => jet_hists(coll, *pos),
        }
    }
}

/// Event weights: product of scalar columns times a constant factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
    /// Scalar columns multiplied into the weight.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Constant factor (for example luminosity × cross section).
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self { columns: Vec::new(), factor: default_factor() }
    }
}

impl WeightsConfig {
    /// True when every event weighs 1.
    pub fn is_unit(&self) -> bool {
        self.columns.is_empty() && self.factor == 1.0
    }

    /// Per-event weights of a chunk; `None` for unit weights.
    pub fn evaluate(&self, events: &EventTable) -> Result<Option<Vec<f64>>> {
        if self.is_unit() {
            return Ok(None);
        }
        let mut w = vec![self.factor; events.n_events()];
        for name in &self.columns {
            for (acc, v) in w.iter_mut().zip(events.scalar(name)?) {
                *acc *= v;
            }
        }
        if let Some(i) = w.iter().position(|v| !v.is_finite()) {
            return Err(Error::Validation(format!("non-finite event weight at event {i}")));
        }
        Ok(Some(w))
    }
}

/// The analysis document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Derived stage.
    #[serde(default)]
    pub workflow: Workflow,
    /// Parameter files, merged in order; relative paths are resolved
    /// against the directory of the analysis file.
    #[serde(default)]
    pub parameters: Vec<PathBuf>,
    /// Extra cuts added to the default registry.
    #[serde(default)]
    pub cuts: Vec<CutDefinition>,
    /// Registry keys of the preselection cuts.
    #[serde(default)]
    pub preselections: Vec<String>,
    /// Category layout, written as a one-key map (`standard_hh4b: {..}` or
    /// `custom: [..]`).
    #[serde(default, with = "serde_yaml_ng::with::singleton_map")]
    pub categories: CategoriesConfig,
    /// Histograms filled per category, each a one-key map.
    #[serde(default, with = "serde_yaml_ng::with::singleton_map_recursive")]
    pub histograms: Vec<HistogramEntry>,
    /// Columns saved per category.
    #[serde(default)]
    pub columns: Vec<ColOut>,
    /// Event weights.
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl AnalysisConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read and parse a file, resolving parameter paths relative to it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("analysis file {}: {e}", path.display())))?;
        let mut cfg = Self::from_yaml(&text)
            .map_err(|e| Error::Config(format!("analysis file {}: {e}", path.display())))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for p in &mut cfg.parameters {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        Ok(cfg)
    }

    /// Default registry plus the user-defined cuts.
    pub fn registry(&self) -> Result<CutRegistry> {
        let mut registry = CutRegistry::hh4b()?;
        for def in &self.cuts {
            let name = def.name.clone().unwrap_or_else(|| def.key.clone());
            let cut = Cut::from_shared(name, def.params.clone(), cut_function(&def.function)?)?;
            registry.register(def.key.clone(), cut)?;
        }
        Ok(registry)
    }
}

#[derive(Debug, Clone)]
enum Stage {
    Hh4b(DerivedFields),
    JetMatching(JetMatching),
}

/// A fully resolved analysis, ready to process chunks.
#[derive(Debug, Clone)]
pub struct Analysis {
    stage: Stage,
    categories: Categories,
    histograms: Vec<HistConf>,
    columns: Vec<ColOut>,
    weights: WeightsConfig,
}

impl Analysis {
    /// Load an analysis file and the parameter files it names.
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg = AnalysisConfig::from_file(path)?;
        let params = ParameterBundle::from_files(&cfg.parameters)?;
        Self::build(&cfg, &params)
    }

    /// Resolve every cut, selection and histogram.
    pub fn build(cfg: &AnalysisConfig, params: &ParameterBundle) -> Result<Self> {
        let presel = params.object_preselection()?;
        let stage = match cfg.workflow {
            Workflow::Hh4b => Stage::Hh4b(DerivedFields::from_preselection(&presel)?),
            Workflow::JetMatching => Stage::JetMatching(JetMatching::new(params.jet_matching()?, &presel)?),
        };

        let registry = cfg.registry()?;
        let preselection = registry.resolve(&cfg.preselections)?;
        let categories = match &cfg.categories {
            CategoriesConfig::StandardHh4b { include_2b } => {
                let layout = Categories::hh4b(&registry, *include_2b)?;
                Categories::new(preselection, layout.regions().to_vec())?
            }
            CategoriesConfig::Custom(defs) => {
                let regions = defs
                    .iter()
                    .map(|d| Ok(Region::new(d.name.clone(), registry.resolve(&d.cuts)?)))
                    .collect::<Result<Vec<_>>>()?;
                Categories::new(preselection, regions)?
            }
        };

        let histograms: Vec<HistConf> = cfg.histograms.iter().flat_map(HistogramEntry::expand).collect();
        validate_all(&histograms)?;

        log::info!(
            "analysis: {:?} workflow, {} preselection cut(s), {} categories, {} histograms",
            cfg.workflow,
            categories.preselection().len(),
            categories.regions().len(),
            histograms.len()
        );
        Ok(Self { stage, categories, histograms, columns: cfg.columns.clone(), weights: cfg.weights.clone() })
    }

    /// Categories in evaluation order.
    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Expanded histogram definitions.
    pub fn histograms(&self) -> &[HistConf] {
        &self.histograms
    }

    /// Derived stage, selection and outputs of one raw chunk.
    pub fn process(&self, raw: &EventTable) -> Result<AnalysisOutput> {
        let events = match &self.stage {
            Stage::Hh4b(d) => d.apply(raw)?,
            Stage::JetMatching(m) => m.apply(raw)?,
        };
        let masks = self.categories.evaluate(&events)?;
        let weights = self.weights.evaluate(&events)?;
        AnalysisOutput::from_chunk(&events, &masks, &self.histograms, &self.columns, weights.as_deref())
    }
}
