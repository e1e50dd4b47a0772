//! # hh-select
//!
//! Selection predicates for the VBF HH→4b analysis.
//!
//! Building blocks, leaf to root:
//! - [`objects`]: per-object preselection profiles producing filtered collections
//! - [`derived`]: the stage that adds good-object collections, counts and
//!   VBF pair observables to a raw event table
//! - [`predicates`]: positional and count predicates with absent-safe semantics
//! - [`cuts`] / [`library`] / [`jme`]: named, parameterized cut functions
//! - [`registry`]: the named cuts of the analysis and factories for scans
//! - [`region`]: regions, categories and cutflows
//! - [`matching`]: generator/reco jet matching for jet response studies

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cuts;
pub mod derived;
pub mod jme;
pub mod library;
pub mod matching;
pub mod objects;
pub mod predicates;
pub mod region;
pub mod registry;

pub use cuts::{Cut, CutFunction, CutMask};
pub use derived::DerivedFields;
pub use matching::{FlavourSelection, JetMatching, JetMatchingConfig};
pub use objects::{JetProfile, JetSelection, LeptonFlavour, LeptonSelection, ObjectPreselection};
pub use predicates::Comparator;
pub use region::{CategoryMasks, Categories, Cutflow, Region, RegionMask};
pub use registry::CutRegistry;
