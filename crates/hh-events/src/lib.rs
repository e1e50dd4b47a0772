//! # hh-events
//!
//! Columnar event tables for the HH4b selection.
//!
//! An [`EventTable`] holds one chunk of events: scalar per-event columns and
//! named variable-length [`ObjectCollection`]s (jets, leptons). Collections
//! are stored as flat field arrays plus per-event offsets, and every
//! operation (filtering, ordering, padding, positional access) returns a new
//! value rather than mutating the input.
//!
//! ## Example
//!
//! ```
//! use hh_events::{EventTable, ObjectCollection};
//!
//! let jets = ObjectCollection::from_rows(&[
//!     ("pt", vec![vec![40.0, 90.0], vec![]]),
//!     ("eta", vec![vec![0.1, -1.2], vec![]]),
//! ])
//! .unwrap();
//! let table = EventTable::new(2).with_collection("Jet", jets).unwrap();
//! let ordered = table.collection("Jet").unwrap().sort_by_desc("pt").unwrap();
//! assert_eq!(ordered.field_at("pt", 0).unwrap(), vec![Some(90.0), None]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod collection;
pub mod jagged;
pub mod kinematics;
pub mod table;

pub use chunk::{ChunkFile, CollectionFile, read_chunk};
pub use collection::{ObjectCollection, PaddedField};
pub use jagged::JaggedCol;
pub use table::{EVENTS, EventTable};
