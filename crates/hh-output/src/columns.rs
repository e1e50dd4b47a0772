//! Flat column dumps of selected events.

use std::collections::BTreeMap;

use hh_core::{Error, Result};
use hh_events::{EVENTS, EventTable};
use hh_select::RegionMask;
use serde::{Deserialize, Serialize};

/// Fields of one collection to save for every event of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColOut {
    /// Collection name, or `events` for scalar fields.
    pub collection: String,
    /// Fields to save.
    pub fields: Vec<String>,
}

impl ColOut {
    /// Save `fields` of `collection`.
    pub fn new<S: Into<String>>(collection: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self { collection: collection.into(), fields: fields.into_iter().map(Into::into).collect() }
    }
}

/// Saved columns: flat values per field plus per-event object counts.
///
/// For `events` there is one value per selected event and `counts` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutput {
    /// Source collection.
    pub collection: String,
    /// Objects per selected event.
    pub counts: Vec<usize>,
    /// Flat values per field.
    pub fields: BTreeMap<String, Vec<f64>>,
}

impl ColumnOutput {
    /// Append another chunk.
    pub fn extend(&mut self, other: ColumnOutput) -> Result<()> {
        if self.collection != other.collection {
            return Err(Error::Validation(format!(
                "cannot append columns of '{}' to '{}'",
                other.collection, self.collection
            )));
        }
        self.counts.extend(other.counts);
        for (name, values) in other.fields {
            self.fields.entry(name).or_default().extend(values);
        }
        Ok(())
    }

    /// Number of selected events.
    pub fn n_events(&self) -> usize {
        if self.collection == EVENTS {
            self.fields.values().next().map_or(0, Vec::len)
        } else {
            self.counts.len()
        }
    }
}

/// Extract every requested column for the events (and objects) of `region`.
pub fn extract_columns(outs: &[ColOut], events: &EventTable, region: &RegionMask) -> Result<Vec<ColumnOutput>> {
    outs.iter()
        .map(|out| {
            if out.collection == EVENTS {
                let fields = out
                    .fields
                    .iter()
                    .map(|f| {
                        let col = events.scalar(f)?;
                        Ok((f.clone(), region.events.indices().into_iter().map(|e| col[e]).collect()))
                    })
                    .collect::<Result<_>>()?;
                return Ok(ColumnOutput { collection: EVENTS.to_string(), counts: Vec::new(), fields });
            }
            let raw = events.collection(&out.collection)?;
            let coll = match region.objects.get(&out.collection) {
                Some(mask) => raw.filter(mask)?,
                None => raw.clone(),
            };
            let selected = coll.select_events(&region.events)?;
            let fields = out
                .fields
                .iter()
                .map(|f| Ok((f.clone(), selected.field(f)?.to_vec())))
                .collect::<Result<_>>()?;
            Ok(ColumnOutput { collection: out.collection.clone(), counts: selected.counts(), fields })
        })
        .collect()
}
