//! # hh-output
//!
//! Per-category outputs of the selection: histograms filled from event or
//! object fields, flat column dumps, and an accumulator that merges the
//! results of independent chunks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod columns;
pub mod hist;

pub use accumulator::AnalysisOutput;
pub use columns::{ColOut, ColumnOutput, extract_columns};
pub use hist::{
    Axis, FilledHistogram, FlowPolicy, HistConf, count_hist, fill_histograms, jet_hists, validate_all,
};
