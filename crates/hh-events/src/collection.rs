//! Variable-length per-event object collections.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use hh_core::{Error, Mask, ObjectMask, Result};

use crate::jagged::{JaggedCol, offsets_from_counts, validate_offsets};

/// A named-field record collection with a variable number of objects per event.
///
/// All fields share one offsets array. Objects carry no inherent order;
/// use [`ObjectCollection::sort_by_desc`] before positional access.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCollection {
    offsets: Vec<usize>,
    fields: BTreeMap<String, Vec<f64>>,
}

impl ObjectCollection {
    /// Empty-field collection with the given layout.
    pub fn with_offsets(offsets: Vec<usize>) -> Result<Self> {
        validate_offsets(&offsets)?;
        Ok(Self { offsets, fields: BTreeMap::new() })
    }

    /// Empty-field collection with the given per-event counts.
    pub fn with_counts(counts: &[usize]) -> Self {
        Self { offsets: offsets_from_counts(counts), fields: BTreeMap::new() }
    }

    /// Collection with no objects in any of `n_events` events.
    pub fn empty(n_events: usize) -> Self {
        Self { offsets: vec![0; n_events + 1], fields: BTreeMap::new() }
    }

    /// Build from per-event rows, one entry per field.
    ///
    /// Every field must have the same number of objects in every event.
    pub fn from_rows(fields: &[(&str, Vec<Vec<f64>>)]) -> Result<Self> {
        let Some((_, first)) = fields.first() else {
            return Err(Error::Validation("collection needs at least one field".into()));
        };
        let counts: Vec<usize> = first.iter().map(Vec::len).collect();
        let mut out = Self::with_counts(&counts);
        for (name, rows) in fields {
            let col = JaggedCol::from_rows(rows);
            if col.offsets != out.offsets {
                return Err(Error::Validation(format!(
                    "field '{name}' does not match the collection layout"
                )));
            }
            out.fields.insert((*name).to_string(), col.flat);
        }
        Ok(out)
    }

    /// Return a new collection with `name` set to the flat `values`.
    pub fn with_field(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(Error::Validation(format!(
                "field '{}' has {} values, collection has {} objects",
                name,
                values.len(),
                self.len()
            )));
        }
        self.fields.insert(name, values);
        Ok(self)
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total number of objects across all events.
    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// True if no event has any object.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event boundaries.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of objects in each event.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Field names, sorted.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// True if the collection carries `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Flat values of a field.
    pub fn field(&self, name: &str) -> Result<&[f64]> {
        self.fields.get(name).map(Vec::as_slice).ok_or_else(|| Error::MissingColumn(name.into()))
    }

    /// A field as a standalone jagged column.
    pub fn jagged(&self, name: &str) -> Result<JaggedCol> {
        Ok(JaggedCol { flat: self.field(name)?.to_vec(), offsets: self.offsets.clone() })
    }

    /// Values of a field for one event.
    pub fn row(&self, name: &str, row: usize) -> Result<&[f64]> {
        let values = self.field(name)?;
        Ok(&values[self.offsets[row]..self.offsets[row + 1]])
    }

    /// Per-object mask from a predicate on one field.
    pub fn object_mask(&self, name: &str, pred: impl Fn(f64) -> bool) -> Result<ObjectMask> {
        let flat = self.field(name)?.iter().map(|&v| pred(v)).collect();
        ObjectMask::new(flat, self.offsets.clone())
    }

    /// Mask with every object passing.
    pub fn all_objects(&self) -> ObjectMask {
        ObjectMask { flat: vec![true; self.len()], offsets: self.offsets.clone() }
    }

    /// Keep only objects where `mask` is true. The input is left unchanged.
    pub fn filter(&self, mask: &ObjectMask) -> Result<Self> {
        if mask.offsets != self.offsets {
            return Err(Error::Validation("object mask does not match collection layout".into()));
        }
        let keep: Vec<usize> = mask.flat.iter().enumerate().filter_map(|(i, &b)| b.then_some(i)).collect();
        let counts: Vec<usize> = mask.counts();
        Ok(self.gather(&keep, &counts))
    }

    /// Objects of each event permuted into descending order of `field`.
    ///
    /// The sort is stable; NaN values sort after every number.
    pub fn sort_by_desc(&self, field: &str) -> Result<Self> {
        let values = self.field(field)?;
        let mut order = Vec::with_capacity(self.len());
        for w in self.offsets.windows(2) {
            let mut idx: Vec<usize> = (w[0]..w[1]).collect();
            idx.sort_by(|&a, &b| desc_nan_last(values[a], values[b]));
            order.extend(idx);
        }
        Ok(self.gather(&order, &self.counts()))
    }

    /// Keep at most `n` leading objects per event.
    pub fn truncate(&self, n: usize) -> Self {
        let mut idx = Vec::new();
        let mut counts = Vec::with_capacity(self.n_events());
        for w in self.offsets.windows(2) {
            let end = w[1].min(w[0] + n);
            idx.extend(w[0]..end);
            counts.push(end - w[0]);
        }
        self.gather(&idx, &counts)
    }

    /// Field value at position `index` of every event; `None` where the
    /// event has `index` objects or fewer.
    pub fn field_at(&self, field: &str, index: usize) -> Result<Vec<Option<f64>>> {
        let values = self.field(field)?;
        Ok(self
            .offsets
            .windows(2)
            .map(|w| if w[0] + index < w[1] { Some(values[w[0] + index]) } else { None })
            .collect())
    }

    /// Pad every event to at least `width` slots of `field`, filling with absent.
    pub fn pad_none(&self, field: &str, width: usize) -> Result<PaddedField> {
        let values = self.field(field)?;
        let rows = self
            .offsets
            .windows(2)
            .map(|w| {
                let mut row: Vec<Option<f64>> = values[w[0]..w[1]].iter().copied().map(Some).collect();
                if row.len() < width {
                    row.resize(width, None);
                }
                row
            })
            .collect();
        Ok(PaddedField { width, rows })
    }

    /// Keep only the events where `mask` is true.
    pub fn select_events(&self, mask: &Mask) -> Result<Self> {
        if mask.len() != self.n_events() {
            return Err(Error::Validation(format!(
                "event mask has {} entries, collection has {} events",
                mask.len(),
                self.n_events()
            )));
        }
        let mut idx = Vec::new();
        let mut counts = Vec::new();
        for (w, keep) in self.offsets.windows(2).zip(mask.iter()) {
            if keep {
                idx.extend(w[0]..w[1]);
                counts.push(w[1] - w[0]);
            }
        }
        Ok(self.gather(&idx, &counts))
    }

    /// Gather objects by flat index into a new collection with per-event `counts`.
    pub fn take(&self, idx: &[usize], counts: &[usize]) -> Result<Self> {
        if idx.len() != counts.iter().sum::<usize>() {
            return Err(Error::Validation(format!(
                "take: {} indices but counts sum to {}",
                idx.len(),
                counts.iter().sum::<usize>()
            )));
        }
        if let Some(&bad) = idx.iter().find(|&&i| i >= self.len()) {
            return Err(Error::Validation(format!(
                "take: index {bad} out of range for {} objects",
                self.len()
            )));
        }
        Ok(self.gather(idx, counts))
    }

    fn gather(&self, idx: &[usize], counts: &[usize]) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(name, values)| (name.clone(), idx.iter().map(|&i| values[i]).collect()))
            .collect();
        Self { offsets: offsets_from_counts(counts), fields }
    }
}

fn desc_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// A field padded to a minimum number of slots per event.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedField {
    width: usize,
    rows: Vec<Vec<Option<f64>>>,
}

impl PaddedField {
    /// Minimum number of slots per event.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Slot `index` of every event. `index` must be below the padding width.
    pub fn slot(&self, index: usize) -> Result<Vec<Option<f64>>> {
        if index >= self.width {
            return Err(Error::Validation(format!(
                "slot {index} is outside the padded width {}",
                self.width
            )));
        }
        Ok(self.rows.iter().map(|r| r[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jets() -> ObjectCollection {
        ObjectCollection::from_rows(&[
            ("pt", vec![vec![30.0, 90.0, 60.0], vec![], vec![45.0]]),
            ("btag", vec![vec![0.9, 0.1, 0.5], vec![], vec![0.3]]),
        ])
        .unwrap()
    }

    #[test]
    fn sort_desc_per_event() {
        let s = jets().sort_by_desc("pt").unwrap();
        assert_eq!(s.row("pt", 0).unwrap(), &[90.0, 60.0, 30.0]);
        assert_eq!(s.row("btag", 0).unwrap(), &[0.1, 0.5, 0.9]);
        assert!(s.row("pt", 1).unwrap().is_empty());
        assert_eq!(s.counts(), vec![3, 0, 1]);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let c = ObjectCollection::from_rows(&[
            ("pt", vec![vec![50.0, 50.0, 70.0]]),
            ("id", vec![vec![1.0, 2.0, 3.0]]),
        ])
        .unwrap();
        let s = c.sort_by_desc("pt").unwrap();
        assert_eq!(s.row("id", 0).unwrap(), &[3.0, 1.0, 2.0]);
    }

    #[test]
    fn nan_sorts_last() {
        let c = ObjectCollection::from_rows(&[("pt", vec![vec![f64::NAN, 10.0, 20.0]])]).unwrap();
        let s = c.sort_by_desc("pt").unwrap();
        let row = s.row("pt", 0).unwrap();
        assert_eq!(&row[..2], &[20.0, 10.0]);
        assert!(row[2].is_nan());
    }

    #[test]
    fn filter_is_non_destructive() {
        let c = jets();
        let m = c.object_mask("pt", |pt| pt > 40.0).unwrap();
        let f = c.filter(&m).unwrap();
        assert_eq!(f.counts(), vec![2, 0, 1]);
        assert_eq!(f.row("pt", 0).unwrap(), &[90.0, 60.0]);
        assert_eq!(c.counts(), vec![3, 0, 1]);
    }

    #[test]
    fn positional_access_and_padding() {
        let s = jets().sort_by_desc("pt").unwrap();
        assert_eq!(s.field_at("pt", 1).unwrap(), vec![Some(60.0), None, None]);
        let p = s.pad_none("btag", 2).unwrap();
        assert_eq!(p.slot(1).unwrap(), vec![Some(0.5), None, None]);
        assert!(p.slot(2).is_err());
    }

    #[test]
    fn truncate_and_select_events() {
        let c = jets().truncate(2);
        assert_eq!(c.counts(), vec![2, 0, 1]);
        let sel = c.select_events(&Mask::new(vec![false, true, true])).unwrap();
        assert_eq!(sel.counts(), vec![0, 1]);
        assert_eq!(sel.row("pt", 1).unwrap(), &[45.0]);
    }

    #[test]
    fn mismatched_rows_rejected() {
        let r = ObjectCollection::from_rows(&[("pt", vec![vec![1.0]]), ("eta", vec![vec![]])]);
        assert!(r.is_err());
        assert!(matches!(jets().field("phi"), Err(Error::MissingColumn(_))));
    }
}
