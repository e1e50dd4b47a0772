//! Per-chunk outputs and their merge.

use std::collections::BTreeMap;

use hh_core::Result;
use hh_events::EventTable;
use hh_select::{CategoryMasks, Cutflow};
use serde::{Deserialize, Serialize};

use crate::columns::{ColOut, ColumnOutput, extract_columns};
use crate::hist::{FilledHistogram, HistConf, fill_histograms};

/// Everything produced for one chunk, or for several merged chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Event counts after each selection step.
    pub cutflow: Cutflow,
    /// Sum of event weights per category.
    pub sumw: BTreeMap<String, f64>,
    /// Histograms per category, keyed by histogram name.
    pub histograms: BTreeMap<String, BTreeMap<String, FilledHistogram>>,
    /// Saved columns per category.
    pub columns: BTreeMap<String, Vec<ColumnOutput>>,
}

impl AnalysisOutput {
    /// Fill histograms and columns of every category of one chunk.
    pub fn from_chunk(
        events: &EventTable,
        masks: &CategoryMasks,
        hists: &[HistConf],
        cols: &[ColOut],
        weights: Option<&[f64]>,
    ) -> Result<Self> {
        let mut out = Self { cutflow: Cutflow::from_masks(events.n_events(), masks), ..Self::default() };
        for (category, region) in &masks.regions {
            let sumw = region.events.indices().iter().map(|&e| weights.map_or(1.0, |w| w[e])).sum();
            out.sumw.insert(category.clone(), sumw);
            let filled = fill_histograms(hists, events, region, weights)?;
            out.histograms.insert(category.clone(), filled.into_iter().map(|h| (h.name.clone(), h)).collect());
            if !cols.is_empty() {
                out.columns.insert(category.clone(), extract_columns(cols, events, region)?);
            }
        }
        log::debug!(
            "filled {} histograms in {} categories from {} events",
            hists.len(),
            masks.regions.len(),
            events.n_events()
        );
        Ok(out)
    }

    /// Add another output into this one.
    pub fn merge(&mut self, other: AnalysisOutput) -> Result<()> {
        self.cutflow += &other.cutflow;
        for (category, w) in other.sumw {
            *self.sumw.entry(category).or_default() += w;
        }
        for (category, hists) in other.histograms {
            let mine = self.histograms.entry(category).or_default();
            for (name, h) in hists {
                match mine.get_mut(&name) {
                    Some(acc) => acc.merge(&h)?,
                    None => {
                        mine.insert(name, h);
                    }
                }
            }
        }
        for (category, cols) in other.columns {
            match self.columns.get_mut(&category) {
                Some(mine) => {
                    for (acc, c) in mine.iter_mut().zip(cols) {
                        acc.extend(c)?;
                    }
                }
                None => {
                    self.columns.insert(category, cols);
                }
            }
        }
        Ok(())
    }
}
