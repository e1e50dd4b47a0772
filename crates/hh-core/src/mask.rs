//! Per-event and per-object boolean masks.
//!
//! A [`Mask`] is always fully defined. Computations that can hit an absent
//! value (indexing past the end of a short collection, a derived field that
//! does not exist for an event) produce an [`OptionalMask`], which has to be
//! resolved explicitly before it can be combined into a region decision.

use crate::error::{Error, Result};

/// Definite per-event boolean mask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mask(Vec<bool>);

impl Mask {
    /// Wrap an existing vector.
    pub fn new(values: Vec<bool>) -> Self {
        Self(values)
    }

    /// Mask of `n` events, all passing.
    pub fn all(n: usize) -> Self {
        Self(vec![true; n])
    }

    /// Mask of `n` events, none passing.
    pub fn none(n: usize) -> Self {
        Self(vec![false; n])
    }

    /// Number of events covered by this mask.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the mask covers no events.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of passing events.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Value for event `i`.
    pub fn get(&self, i: usize) -> Option<bool> {
        self.0.get(i).copied()
    }

    /// Borrow the underlying values.
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Consume into the underlying vector.
    pub fn into_vec(self) -> Vec<bool> {
        self.0
    }

    /// Iterate over the per-event values.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Indices of passing events.
    pub fn indices(&self) -> Vec<usize> {
        self.0.iter().enumerate().filter_map(|(i, &b)| b.then_some(i)).collect()
    }

    /// Elementwise AND. Both masks must cover the same events.
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        check_len("and", self.len(), other.len())?;
        Ok(Mask(self.0.iter().zip(&other.0).map(|(&a, &b)| a && b).collect()))
    }

    /// Elementwise OR. Both masks must cover the same events.
    pub fn or(&self, other: &Mask) -> Result<Mask> {
        check_len("or", self.len(), other.len())?;
        Ok(Mask(self.0.iter().zip(&other.0).map(|(&a, &b)| a || b).collect()))
    }

    /// Elementwise negation.
    pub fn not(&self) -> Mask {
        Mask(self.0.iter().map(|&b| !b).collect())
    }

    /// Lift into an [`OptionalMask`] with no absent entries.
    pub fn to_optional(&self) -> OptionalMask {
        OptionalMask(self.0.iter().map(|&b| Some(b)).collect())
    }
}

impl From<Vec<bool>> for Mask {
    fn from(values: Vec<bool>) -> Self {
        Self(values)
    }
}

impl FromIterator<bool> for Mask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-event mask that may contain absent entries.
///
/// Absent propagates through [`OptionalMask::and`]: if either operand is
/// absent for an event, the result is absent for that event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionalMask(Vec<Option<bool>>);

impl OptionalMask {
    /// Wrap an existing vector.
    pub fn new(values: Vec<Option<bool>>) -> Self {
        Self(values)
    }

    /// Number of events covered by this mask.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the mask covers no events.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying values.
    pub fn as_slice(&self) -> &[Option<bool>] {
        &self.0
    }

    /// Number of absent entries.
    pub fn count_absent(&self) -> usize {
        self.0.iter().filter(|v| v.is_none()).count()
    }

    /// Elementwise AND with absent propagation.
    pub fn and(&self, other: &OptionalMask) -> Result<OptionalMask> {
        check_len("and", self.len(), other.len())?;
        Ok(OptionalMask(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(*a && *b),
                    _ => None,
                })
                .collect(),
        ))
    }

    /// Elementwise AND with a definite mask.
    pub fn and_mask(&self, other: &Mask) -> Result<OptionalMask> {
        self.and(&other.to_optional())
    }

    /// Turn entries into absent wherever `keep` is false.
    ///
    /// This is how a predicate restricts itself to a pre-filtered subset of
    /// events without reindexing the table.
    pub fn restrict(&self, keep: &Mask) -> Result<OptionalMask> {
        check_len("restrict", self.len(), keep.len())?;
        Ok(OptionalMask(
            self.0.iter().zip(keep.iter()).map(|(&v, k)| if k { v } else { None }).collect(),
        ))
    }

    /// Resolve absent entries to `value`.
    pub fn fill_none(&self, value: bool) -> Mask {
        Mask(self.0.iter().map(|v| v.unwrap_or(value)).collect())
    }

    /// Convert to a definite mask, failing if any entry is absent.
    ///
    /// `origin` names the cut in the resulting error.
    pub fn into_defined(self, origin: &str) -> Result<Mask> {
        let count = self.count_absent();
        if count > 0 {
            return Err(Error::UndefinedMask { cut: origin.to_string(), count });
        }
        Ok(Mask(self.0.into_iter().map(|v| v.unwrap_or(false)).collect()))
    }
}

impl From<Vec<Option<bool>>> for OptionalMask {
    fn from(values: Vec<Option<bool>>) -> Self {
        Self(values)
    }
}

impl FromIterator<Option<bool>> for OptionalMask {
    fn from_iter<I: IntoIterator<Item = Option<bool>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-object mask aligned 1:1 with a jagged collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMask {
    /// Flat per-object values across all events.
    pub flat: Vec<bool>,
    /// Event boundaries: `offsets.len() == n_events + 1`.
    pub offsets: Vec<usize>,
}

impl ObjectMask {
    /// Build a mask, checking that `flat` matches `offsets`.
    pub fn new(flat: Vec<bool>, offsets: Vec<usize>) -> Result<Self> {
        let expected = offsets.last().copied().unwrap_or(0);
        if offsets.is_empty() || flat.len() != expected {
            return Err(Error::Validation(format!(
                "object mask has {} values but offsets describe {}",
                flat.len(),
                expected
            )));
        }
        Ok(Self { flat, offsets })
    }

    /// Build a mask from per-object optional values, failing on any absent value.
    pub fn from_optional(
        flat: Vec<Option<bool>>,
        offsets: Vec<usize>,
        origin: &str,
    ) -> Result<Self> {
        let count = flat.iter().filter(|v| v.is_none()).count();
        if count > 0 {
            return Err(Error::UndefinedMask { cut: origin.to_string(), count });
        }
        Self::new(flat.into_iter().map(|v| v.unwrap_or(false)).collect(), offsets)
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Values for event `row`.
    pub fn row(&self, row: usize) -> &[bool] {
        &self.flat[self.offsets[row]..self.offsets[row + 1]]
    }

    /// Elementwise AND; both masks must share offsets.
    pub fn and(&self, other: &ObjectMask) -> Result<ObjectMask> {
        if self.offsets != other.offsets {
            return Err(Error::Validation("object masks have different layouts".into()));
        }
        Ok(ObjectMask {
            flat: self.flat.iter().zip(&other.flat).map(|(&a, &b)| a && b).collect(),
            offsets: self.offsets.clone(),
        })
    }

    /// Per-event count of passing objects.
    pub fn counts(&self) -> Vec<usize> {
        (0..self.n_events()).map(|r| self.row(r).iter().filter(|&&b| b).count()).collect()
    }

    /// Event mask: true where at least one object passes.
    pub fn any(&self) -> Mask {
        (0..self.n_events()).map(|r| self.row(r).iter().any(|&b| b)).collect()
    }
}

fn check_len(op: &str, a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(Error::Validation(format!("mask length mismatch in {op}: {a} vs {b}")));
    }
    Ok(())
}
