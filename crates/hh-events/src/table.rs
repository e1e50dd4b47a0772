//! Per-chunk event table.

use std::collections::BTreeMap;

use hh_core::{Error, Mask, Result};

use crate::collection::ObjectCollection;

/// Pseudo-collection name addressing the scalar per-event columns.
pub const EVENTS: &str = "events";

/// One chunk of events: scalar columns plus named object collections.
///
/// Builders consume the table and return a new one, so derived columns are
/// added by explicit pipeline stages rather than by mutating shared state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventTable {
    n_events: usize,
    scalars: BTreeMap<String, Vec<f64>>,
    collections: BTreeMap<String, ObjectCollection>,
}

impl EventTable {
    /// Empty table of `n_events` events.
    pub fn new(n_events: usize) -> Self {
        Self { n_events, scalars: BTreeMap::new(), collections: BTreeMap::new() }
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Return a table with the scalar column `name` set.
    pub fn with_scalar(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.n_events {
            return Err(Error::Validation(format!(
                "column '{}' has {} entries, table has {} events",
                name,
                values.len(),
                self.n_events
            )));
        }
        self.scalars.insert(name, values);
        Ok(self)
    }

    /// Return a table with the collection `name` set.
    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        collection: ObjectCollection,
    ) -> Result<Self> {
        let name = name.into();
        if collection.n_events() != self.n_events {
            return Err(Error::Validation(format!(
                "collection '{}' has {} events, table has {}",
                name,
                collection.n_events(),
                self.n_events
            )));
        }
        self.collections.insert(name, collection);
        Ok(self)
    }

    /// Scalar column.
    pub fn scalar(&self, name: &str) -> Result<&[f64]> {
        self.scalars.get(name).map(Vec::as_slice).ok_or_else(|| Error::MissingColumn(name.into()))
    }

    /// Scalar column with NaN entries reported as absent.
    pub fn scalar_optional(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.scalar(name)?.iter().map(|&v| (!v.is_nan()).then_some(v)).collect())
    }

    /// Object collection.
    pub fn collection(&self, name: &str) -> Result<&ObjectCollection> {
        self.collections.get(name).ok_or_else(|| Error::MissingCollection(name.into()))
    }

    /// True if a scalar column `name` exists.
    pub fn has_scalar(&self, name: &str) -> bool {
        self.scalars.contains_key(name)
    }

    /// True if a collection `name` exists.
    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Scalar column names, sorted.
    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalars.keys().map(String::as_str)
    }

    /// Collection names, sorted.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// New table holding only the events where `mask` is true.
    pub fn select_events(&self, mask: &Mask) -> Result<Self> {
        if mask.len() != self.n_events {
            return Err(Error::Validation(format!(
                "event mask has {} entries, table has {} events",
                mask.len(),
                self.n_events
            )));
        }
        let scalars = self
            .scalars
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().zip(mask.iter()).filter(|(_, m)| *m).map(|(x, _)| *x).collect()))
            .collect();
        let collections = self
            .collections
            .iter()
            .map(|(k, c)| Ok((k.clone(), c.select_events(mask)?)))
            .collect::<Result<_>>()?;
        Ok(Self { n_events: mask.count(), scalars, collections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_validate_length() {
        let t = EventTable::new(2);
        assert!(t.clone().with_scalar("x", vec![1.0]).is_err());
        let jets = ObjectCollection::with_counts(&[1, 0, 2]);
        assert!(t.with_collection("Jet", jets).is_err());
    }

    #[test]
    fn select_events_subsets_everything() {
        let jets = ObjectCollection::from_rows(&[("pt", vec![vec![10.0], vec![20.0, 5.0], vec![]])])
            .unwrap();
        let t = EventTable::new(3)
            .with_scalar("w", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_collection("Jet", jets)
            .unwrap();
        let s = t.select_events(&Mask::new(vec![false, true, true])).unwrap();
        assert_eq!(s.n_events(), 2);
        assert_eq!(s.scalar("w").unwrap(), &[2.0, 3.0]);
        assert_eq!(s.collection("Jet").unwrap().counts(), vec![2, 0]);
    }

    #[test]
    fn nan_scalars_are_absent() {
        let t = EventTable::new(2).with_scalar("deltaEta", vec![f64::NAN, 6.0]).unwrap();
        assert_eq!(t.scalar_optional("deltaEta").unwrap(), vec![None, Some(6.0)]);
        assert!(matches!(t.scalar("mjj"), Err(Error::MissingColumn(_))));
        assert!(matches!(t.collection("Jet"), Err(Error::MissingCollection(_))));
    }
}
