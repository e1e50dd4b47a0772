//! Flat + offsets representation of one variable-length numeric field.

use hh_core::{Error, Result};

/// One numeric field of a variable-length per-event collection.
#[derive(Debug, Clone, PartialEq)]
pub struct JaggedCol {
    /// Flat array of all values across all events.
    pub flat: Vec<f64>,
    /// Event boundaries: `offsets.len() == n_events + 1`.
    pub offsets: Vec<usize>,
}

impl JaggedCol {
    /// Build from per-event rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let mut flat = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        for row in rows {
            flat.extend_from_slice(row);
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// Build from per-event counts and the flat values, validating the layout.
    pub fn from_counts(counts: &[usize], flat: Vec<f64>) -> Result<Self> {
        let offsets = offsets_from_counts(counts);
        let total = offsets[offsets.len() - 1];
        if flat.len() != total {
            return Err(Error::Validation(format!(
                "jagged column has {} values but counts sum to {}",
                flat.len(),
                total
            )));
        }
        Ok(Self { flat, offsets })
    }

    /// Element `index` of event `row`, or `None` past the end of the row.
    pub fn get(&self, row: usize, index: usize) -> Option<f64> {
        let start = self.offsets[row];
        let end = self.offsets[row + 1];
        if index >= end - start { None } else { Some(self.flat[start + index]) }
    }

    /// Values of event `row`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.flat[self.offsets[row]..self.offsets[row + 1]]
    }

    /// Number of events.
    pub fn n_entries(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Per-event lengths.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Offsets (`len = counts.len() + 1`) from per-event counts.
pub fn offsets_from_counts(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut acc = 0usize;
    offsets.push(0);
    for &c in counts {
        acc += c;
        offsets.push(acc);
    }
    offsets
}

/// Check that offsets start at zero and never decrease.
pub fn validate_offsets(offsets: &[usize]) -> Result<()> {
    if offsets.first() != Some(&0) {
        return Err(Error::Validation("offsets must start at 0".into()));
    }
    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::Validation("offsets must be non-decreasing".into()));
    }
    Ok(())
}
