//! Positional and count predicates over ordered collections.
//!
//! Every comparison against an absent value (a position past the end of a
//! short collection, a NaN derived field) yields an absent mask entry, never
//! a panic. Callers resolve absent entries with
//! [`OptionalMask::fill_none`] before combining with other masks.

use hh_core::{Error, Mask, OptionalMask, Result};
use hh_events::{EventTable, ObjectCollection};
use serde::{Deserialize, Serialize};

/// Direction of a threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// `value > threshold`
    Greater,
    /// `value >= threshold`
    GreaterEq,
    /// `value < threshold`
    Less,
    /// `value <= threshold`
    LessEq,
}

impl Comparator {
    /// Apply to one value. NaN never passes.
    pub fn test(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Greater => value > threshold,
            Comparator::GreaterEq => value >= threshold,
            Comparator::Less => value < threshold,
            Comparator::LessEq => value <= threshold,
        }
    }
}

/// Compare optional per-event values against a threshold.
///
/// Absent and NaN values give absent entries.
pub fn compare(values: &[Option<f64>], cmp: Comparator, threshold: f64) -> OptionalMask {
    values
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()).map(|x| cmp.test(x, threshold)))
        .collect()
}

/// Compare `field` at position `index` of an ordered collection, keeping absent entries.
pub fn positional_optional(
    collection: &ObjectCollection,
    field: &str,
    index: usize,
    cmp: Comparator,
    threshold: f64,
) -> Result<OptionalMask> {
    Ok(compare(&collection.field_at(field, index)?, cmp, threshold))
}

/// Compare `field` at position `index` of an ordered collection.
///
/// Events with `index` objects or fewer fail.
pub fn positional(
    collection: &ObjectCollection,
    field: &str,
    index: usize,
    cmp: Comparator,
    threshold: f64,
) -> Result<Mask> {
    Ok(positional_optional(collection, field, index, cmp, threshold)?.fill_none(false))
}

/// Require each leading object's `field` to pass its own threshold:
/// position `k` is compared against `thresholds[k]`.
pub fn leading_gate(
    collection: &ObjectCollection,
    field: &str,
    cmp: Comparator,
    thresholds: &[f64],
) -> Result<OptionalMask> {
    let mut mask = OptionalMask::new(vec![Some(true); collection.n_events()]);
    for (k, &thr) in thresholds.iter().enumerate() {
        mask = mask.and(&positional_optional(collection, field, k, cmp, thr)?)?;
    }
    Ok(mask)
}

/// Mean of `field` over the first `n` positions; absent unless all `n` exist.
/// `n` must be at least 1.
pub fn leading_mean(collection: &ObjectCollection, field: &str, n: usize) -> Result<Vec<Option<f64>>> {
    if n == 0 {
        return Err(Error::Config(format!("mean of '{field}' over zero leading objects")));
    }
    let columns = (0..n).map(|k| collection.field_at(field, k)).collect::<Result<Vec<_>>>()?;
    Ok((0..collection.n_events())
        .map(|row| {
            let mut sum = 0.0;
            for col in &columns {
                sum += col[row]?;
            }
            Some(sum / n as f64)
        })
        .collect())
}

/// Product of `field` at positions `a` and `b`; absent unless both exist.
pub fn pair_product(
    collection: &ObjectCollection,
    field: &str,
    a: usize,
    b: usize,
) -> Result<Vec<Option<f64>>> {
    let va = collection.field_at(field, a)?;
    let vb = collection.field_at(field, b)?;
    Ok(va.iter().zip(&vb).map(|(x, y)| Some((*x)? * (*y)?)).collect())
}

/// Events whose count column is at least `n`.
pub fn count_at_least(events: &EventTable, count_column: &str, n: usize) -> Result<Mask> {
    Ok(events.scalar(count_column)?.iter().map(|&c| c >= n as f64).collect())
}

/// Events whose count column is exactly zero.
pub fn count_zero(events: &EventTable, count_column: &str) -> Result<Mask> {
    Ok(events.scalar(count_column)?.iter().map(|&c| c == 0.0).collect())
}

/// Compare a scalar per-event column; NaN entries are absent.
pub fn scalar_compare(
    events: &EventTable,
    column: &str,
    cmp: Comparator,
    threshold: f64,
) -> Result<OptionalMask> {
    Ok(compare(&events.scalar_optional(column)?, cmp, threshold))
}
