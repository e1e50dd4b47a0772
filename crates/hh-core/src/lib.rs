//! # hh-core
//!
//! Core types shared by the HH4b selection crates: the error taxonomy,
//! per-event masks (definite and optional), per-object masks, and cut
//! parameter mappings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mask;
pub mod params;

pub use error::{Error, Result};
pub use mask::{Mask, ObjectMask, OptionalMask};
pub use params::{CutParams, ParamValue};
