//! Histogram definitions and single-pass filling per category.
//!
//! An axis reads either a scalar event field (`coll = "events"`), one
//! positional object per event (`pos` set), or every object of a collection.
//! Object collections are first restricted by the region's object mask for
//! that collection, if any.

use std::collections::BTreeSet;

use hh_core::{Error, Result};
use hh_events::{EVENTS, EventTable};
use hh_select::RegionMask;
use serde::{Deserialize, Serialize};

/// Under/overflow handling policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPolicy {
    /// Drop entries outside the range (recorded in `underflow`/`overflow`).
    #[default]
    Drop,
    /// Fold underflow into the first bin and overflow into the last bin.
    Fold,
}

/// One regular axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Axis {
    /// Collection name, or `events` for scalar fields.
    pub coll: String,
    /// Field within the collection.
    pub field: String,
    /// Object position (0 = first as stored); one value per event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<usize>,
    /// Number of bins.
    pub bins: usize,
    /// Lower edge.
    pub start: f64,
    /// Upper edge.
    pub stop: f64,
    /// Axis label; defaults to the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Axis {
    /// Axis over `coll.field`.
    pub fn new(coll: impl Into<String>, field: impl Into<String>, bins: usize, start: f64, stop: f64) -> Self {
        Self { coll: coll.into(), field: field.into(), pos: None, bins, start, stop, label: None }
    }

    /// Read only object `pos` of every event.
    pub fn at(mut self, pos: usize) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn per_event(&self) -> bool {
        self.coll == EVENTS || self.pos.is_some()
    }

    fn validate(&self) -> Result<()> {
        if self.bins == 0 || !(self.start < self.stop) {
            return Err(Error::Config(format!(
                "axis {}.{}: need bins > 0 and start < stop (bins={}, start={}, stop={})",
                self.coll, self.field, self.bins, self.start, self.stop
            )));
        }
        if self.coll == EVENTS && self.pos.is_some() {
            return Err(Error::Config(format!("axis events.{}: scalar fields take no pos", self.field)));
        }
        Ok(())
    }

    /// Bin edges, `bins + 1` of them.
    pub fn edges(&self) -> Vec<f64> {
        let width = (self.stop - self.start) / self.bins as f64;
        (0..=self.bins).map(|i| self.start + width * i as f64).collect()
    }
}

/// A named histogram over one or more axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistConf {
    /// Histogram name.
    pub name: String,
    /// Axes; multi-axis histograms are stored row-major.
    pub axes: Vec<Axis>,
    /// Under/overflow policy.
    #[serde(default)]
    pub flow: FlowPolicy,
}

impl HistConf {
    /// One-axis histogram.
    pub fn new(name: impl Into<String>, axis: Axis) -> Self {
        Self { name: name.into(), axes: vec![axis], flow: FlowPolicy::Drop }
    }

    /// Check the axes can be filled together.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.axes.first() else {
            return Err(Error::Config(format!("histogram '{}' has no axes", self.name)));
        };
        for axis in &self.axes {
            axis.validate().map_err(|e| Error::Config(format!("histogram '{}': {e}", self.name)))?;
            let same_shape = if first.per_event() { axis.per_event() } else { axis.coll == first.coll && axis.pos.is_none() };
            if !same_shape {
                return Err(Error::Config(format!(
                    "histogram '{}': axes mix per-event and per-object entries",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn n_bins(&self) -> usize {
        self.axes.iter().map(|a| a.bins).product()
    }
}

/// Check a list of histogram definitions (valid axes, unique names).
pub fn validate_all(confs: &[HistConf]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for h in confs {
        h.validate()?;
        if !seen.insert(h.name.as_str()) {
            return Err(Error::Config(format!("histogram '{}' defined twice", h.name)));
        }
    }
    Ok(())
}

/// `n{coll}` multiplicity histogram of a derived count column.
pub fn count_hist(coll: &str, bins: usize, start: f64, stop: f64) -> HistConf {
    let field = format!("n{coll}");
    HistConf::new(field.clone(), Axis::new(EVENTS, field.clone(), bins, start, stop).label(field))
}

/// pt/eta/phi/b-tag histograms of a jet collection, either of every jet or
/// of jet `pos`; names are `{coll}_{field}` or `{coll}_{field}_{pos + 1}`.
pub fn jet_hists(coll: &str, pos: Option<usize>) -> Vec<HistConf> {
    const FIELDS: [(&str, usize, f64, f64); 4] = [
        ("pt", 50, 0.0, 500.0),
        ("eta", 50, -5.0, 5.0),
        ("phi", 64, -std::f64::consts::PI, std::f64::consts::PI),
        ("btagPNetB", 50, 0.0, 1.0),
    ];
    FIELDS
        .iter()
        .map(|&(field, bins, start, stop)| {
            let name = match pos {
                Some(p) => format!("{coll}_{field}_{}", p + 1),
                None => format!("{coll}_{field}"),
            };
            let mut axis = Axis::new(coll, field, bins, start, stop).label(name.clone());
            axis.pos = pos;
            HistConf::new(name, axis)
        })
        .collect()
}

/// Result of filling one histogram in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledHistogram {
    /// Histogram name.
    pub name: String,
    /// Axes the histogram was filled with.
    pub axes: Vec<Axis>,
    /// Sum of weights per bin (row-major over the axes).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Sum of weights below the range of any axis (before folding).
    pub underflow: f64,
    /// Sum of weights above the range of any axis (before folding).
    pub overflow: f64,
    /// Entries filled into a bin.
    pub entries: u64,
}

impl FilledHistogram {
    /// Empty histogram for `conf`.
    pub fn empty(conf: &HistConf) -> Self {
        let n = conf.n_bins();
        Self {
            name: conf.name.clone(),
            axes: conf.axes.clone(),
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Add another chunk's result bin by bin.
    pub fn merge(&mut self, other: &FilledHistogram) -> Result<()> {
        if self.name != other.name || self.axes != other.axes {
            return Err(Error::Validation(format!(
                "cannot merge histogram '{}' with '{}' (different binning)",
                self.name, other.name
            )));
        }
        for (a, b) in self.bin_content.iter_mut().zip(&other.bin_content) {
            *a += b;
        }
        for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Sum of in-range weights.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

enum Locate {
    Bin(usize),
    Under,
    Over,
}

/// Find the bin index for a value given sorted bin edges.
fn find_bin(edges: &[f64], val: f64) -> Locate {
    if val < edges[0] {
        return Locate::Under;
    }
    if val >= edges[edges.len() - 1] {
        return Locate::Over;
    }
    // IEEE ordering: -0.0 sits on a 0.0 lower edge, so at least one edge is <= val.
    let below = edges.partition_point(|&e| e <= val);
    Locate::Bin(below.saturating_sub(1))
}

/// Values of one axis, one per entry, with the event each entry belongs to.
fn axis_values(axis: &Axis, events: &EventTable, region: &RegionMask) -> Result<(Vec<usize>, Vec<Option<f64>>)> {
    let selected = region.events.indices();
    if axis.coll == EVENTS {
        let col = events.scalar_optional(&axis.field)?;
        let values = selected.iter().map(|&e| col[e]).collect();
        return Ok((selected, values));
    }
    let raw = events.collection(&axis.coll)?;
    let coll = match region.objects.get(&axis.coll) {
        Some(mask) => raw.filter(mask)?,
        None => raw.clone(),
    };
    if let Some(pos) = axis.pos {
        let col = coll.field_at(&axis.field, pos)?;
        let values = selected.iter().map(|&e| col[e].filter(|v| !v.is_nan())).collect();
        return Ok((selected, values));
    }
    let field = coll.field(&axis.field)?;
    let offsets = coll.offsets();
    let mut owners = Vec::new();
    let mut values = Vec::new();
    for e in selected {
        for v in &field[offsets[e]..offsets[e + 1]] {
            owners.push(e);
            values.push((!v.is_nan()).then_some(*v));
        }
    }
    Ok((owners, values))
}

/// Fill every histogram for one category of one chunk.
///
/// `weights`, if given, holds one weight per event of the chunk; object-level
/// entries carry the weight of their event. Entries with an absent value on
/// any axis are skipped.
pub fn fill_histograms(
    confs: &[HistConf],
    events: &EventTable,
    region: &RegionMask,
    weights: Option<&[f64]>,
) -> Result<Vec<FilledHistogram>> {
    if let Some(w) = weights
        && w.len() != events.n_events()
    {
        return Err(Error::Validation(format!(
            "{} weights for {} events",
            w.len(),
            events.n_events()
        )));
    }
    let mut results = Vec::with_capacity(confs.len());
    for conf in confs {
        conf.validate()?;
        let mut out = FilledHistogram::empty(conf);
        let columns = conf
            .axes
            .iter()
            .map(|a| axis_values(a, events, region))
            .collect::<Result<Vec<_>>>()?;
        let edges: Vec<Vec<f64>> = conf.axes.iter().map(Axis::edges).collect();
        let owners = &columns[0].0;

        'entry: for (entry, &event) in owners.iter().enumerate() {
            let weight = weights.map_or(1.0, |w| w[event]);
            let w2 = weight * weight;
            let mut flat = 0;
            let mut under = false;
            let mut over = false;
            for (axis, ((_, values), edges)) in conf.axes.iter().zip(columns.iter().zip(&edges)) {
                let Some(val) = values[entry] else { continue 'entry };
                let bin = match find_bin(edges, val) {
                    Locate::Bin(b) => b,
                    Locate::Under => {
                        under = true;
                        0
                    }
                    Locate::Over => {
                        over = true;
                        axis.bins - 1
                    }
                };
                flat = flat * axis.bins + bin;
            }
            if under {
                out.underflow += weight;
            } else if over {
                out.overflow += weight;
            }
            if (under || over) && conf.flow == FlowPolicy::Drop {
                continue;
            }
            out.bin_content[flat] += weight;
            out.sumw2[flat] += w2;
            out.entries += 1;
        }
        results.push(out);
    }
    Ok(results)
}
