//! JSON chunk files: the on-disk form of an [`EventTable`].
//!
//! ```json
//! {
//!   "n_events": 2,
//!   "scalars": { "genWeight": [1.0, 0.5] },
//!   "collections": {
//!     "Jet": { "counts": [1, 0], "fields": { "pt": [42.0], "eta": [0.3] } }
//!   }
//! }
//! ```
//!
//! Boolean fields (identification flags) are stored as 0/1.

use std::collections::BTreeMap;
use std::path::Path;

use hh_core::Result;
use serde::{Deserialize, Serialize};

use crate::collection::ObjectCollection;
use crate::jagged::offsets_from_counts;
use crate::table::EventTable;

/// Serialized event chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFile {
    /// Number of events in the chunk.
    pub n_events: usize,
    /// Scalar per-event columns.
    #[serde(default)]
    pub scalars: BTreeMap<String, Vec<f64>>,
    /// Object collections.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionFile>,
}

/// Serialized object collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionFile {
    /// Objects per event.
    pub counts: Vec<usize>,
    /// Flat per-object field values.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<f64>>,
}

impl ChunkFile {
    /// Validate and convert into an [`EventTable`].
    pub fn into_table(self) -> Result<EventTable> {
        let mut table = EventTable::new(self.n_events);
        for (name, values) in self.scalars {
            table = table.with_scalar(name, values)?;
        }
        for (name, coll) in self.collections {
            let mut c = ObjectCollection::with_offsets(offsets_from_counts(&coll.counts))?;
            for (field, values) in coll.fields {
                c = c.with_field(field, values)?;
            }
            table = table.with_collection(name, c)?;
        }
        Ok(table)
    }

    /// Serialize an [`EventTable`].
    pub fn from_table(table: &EventTable) -> Result<Self> {
        let scalars = table
            .scalar_names()
            .map(|n| Ok((n.to_string(), table.scalar(n)?.to_vec())))
            .collect::<Result<_>>()?;
        let collections = table
            .collection_names()
            .map(|n| {
                let c = table.collection(n)?;
                let fields = c
                    .field_names()
                    .map(|f| Ok((f.to_string(), c.field(f)?.to_vec())))
                    .collect::<Result<_>>()?;
                Ok((n.to_string(), CollectionFile { counts: c.counts(), fields }))
            })
            .collect::<Result<_>>()?;
        Ok(Self { n_events: table.n_events(), scalars, collections })
    }
}

/// Read one JSON chunk file into an [`EventTable`].
pub fn read_chunk(path: &Path) -> Result<EventTable> {
    let bytes = std::fs::read(path)?;
    let chunk: ChunkFile = serde_json::from_slice(&bytes)?;
    log::debug!("read chunk {} ({} events)", path.display(), chunk.n_events);
    chunk.into_table()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_validate() {
        let json = r#"{
            "n_events": 2,
            "scalars": {"genWeight": [1.0, 0.5]},
            "collections": {"Jet": {"counts": [2, 0], "fields": {"pt": [42.0, 30.0]}}}
        }"#;
        let chunk: ChunkFile = serde_json::from_str(json).unwrap();
        let t = chunk.into_table().unwrap();
        assert_eq!(t.n_events(), 2);
        assert_eq!(t.collection("Jet").unwrap().row("pt", 0).unwrap(), &[42.0, 30.0]);

        let back = ChunkFile::from_table(&t).unwrap();
        assert_eq!(back.collections["Jet"].counts, vec![2, 0]);
    }

    #[test]
    fn inconsistent_field_rejected() {
        let json = r#"{"n_events": 1, "collections": {"Jet": {"counts": [2], "fields": {"pt": [1.0]}}}}"#;
        let chunk: ChunkFile = serde_json::from_str(json).unwrap();
        assert!(chunk.into_table().is_err());
    }
}
