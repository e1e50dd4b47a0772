//! # hh-config
//!
//! Configuration surface of the selection:
//! - [`parameters`]: layered YAML parameter files (object preselection
//!   thresholds, matching options) merged in order
//! - [`analysis`]: the analysis document naming preselections, categories,
//!   histograms, columns and weights, and its resolution into a runnable
//!   [`Analysis`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod parameters;

pub use analysis::{
    Analysis, AnalysisConfig, CategoriesConfig, CategoryDefinition, CutDefinition, HistogramEntry, WeightsConfig,
    Workflow,
};
pub use parameters::ParameterBundle;
