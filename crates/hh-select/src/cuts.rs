//! Named, parameterized cuts.
//!
//! A [`Cut`] binds a name and a parameter mapping to one [`CutFunction`].
//! Parameters are validated when the cut is built; evaluation is a pure
//! function of the event table.

use std::fmt;
use std::sync::Arc;

use hh_core::{CutParams, Error, Mask, ObjectMask, ParamValue, Result};
use hh_events::EventTable;

/// Output of a cut evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum CutMask {
    /// One definite decision per event.
    Events(Mask),
    /// One decision per object of `collection`.
    Objects {
        /// Collection the mask is aligned with.
        collection: String,
        /// Per-object decisions.
        mask: ObjectMask,
    },
}

impl CutMask {
    /// Number of events covered.
    pub fn n_events(&self) -> usize {
        match self {
            CutMask::Events(m) => m.len(),
            CutMask::Objects { mask, .. } => mask.n_events(),
        }
    }
}

/// A selection predicate shared by any number of named cuts.
///
/// Implementations must be pure: the same table and parameters always give
/// the same mask, and the table is never modified.
pub trait CutFunction: Send + Sync + fmt::Debug {
    /// Identifier of the predicate implementation.
    fn name(&self) -> &str;

    /// Numeric parameters read by [`CutFunction::apply`].
    fn required_params(&self) -> &'static [&'static str];

    /// Check `params` before any event is processed.
    fn validate(&self, params: &CutParams) -> Result<()> {
        for key in self.required_params() {
            params.number(key)?;
        }
        Ok(())
    }

    /// Evaluate on one chunk.
    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask>;
}

/// An immutable (name, parameters, predicate) triple.
#[derive(Clone)]
pub struct Cut {
    name: String,
    params: CutParams,
    function: Arc<dyn CutFunction>,
}

impl Cut {
    /// Build and validate a cut.
    pub fn new(
        name: impl Into<String>,
        params: CutParams,
        function: impl CutFunction + 'static,
    ) -> Result<Self> {
        Self::from_shared(name, params, Arc::new(function))
    }

    /// Build and validate a cut around an already shared predicate.
    pub fn from_shared(
        name: impl Into<String>,
        params: CutParams,
        function: Arc<dyn CutFunction>,
    ) -> Result<Self> {
        let name = name.into();
        function
            .validate(&params)
            .map_err(|e| Error::Config(format!("cut '{name}' ({}): {e}", function.name())))?;
        Ok(Self { name, params, function })
    }

    /// Cut name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters.
    pub fn params(&self) -> &CutParams {
        &self.params
    }

    /// Predicate implementation name.
    pub fn function_name(&self) -> &str {
        self.function.name()
    }

    /// New cut with one parameter replaced; the predicate is shared.
    pub fn with_param(&self, key: &str, value: impl Into<ParamValue>) -> Result<Cut> {
        let mut params = self.params.clone();
        params.insert(key, value);
        Self::from_shared(self.name.clone(), params, Arc::clone(&self.function))
    }

    /// Same cut under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Cut {
        Self { name: name.into(), params: self.params.clone(), function: Arc::clone(&self.function) }
    }

    /// Evaluate on one chunk.
    pub fn evaluate(&self, events: &EventTable) -> Result<CutMask> {
        let mask = self.function.apply(events, &self.params)?;
        if mask.n_events() != events.n_events() {
            return Err(Error::Validation(format!(
                "cut '{}' returned {} entries for {} events",
                self.name,
                mask.n_events(),
                events.n_events()
            )));
        }
        if let CutMask::Events(m) = &mask {
            log::debug!("cut '{}': {}/{} events pass", self.name, m.count(), m.len());
        }
        Ok(mask)
    }
}

impl fmt::Debug for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cut")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("function", &self.function.name())
            .finish()
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.function.name(), self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct MinScalar;

    impl CutFunction for MinScalar {
        fn name(&self) -> &str {
            "min_scalar"
        }

        fn required_params(&self) -> &'static [&'static str] {
            &["min"]
        }

        fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
            let min = params.number("min")?;
            Ok(CutMask::Events(events.scalar("x")?.iter().map(|&x| x > min).collect()))
        }
    }

    fn table() -> EventTable {
        EventTable::new(3).with_scalar("x", vec![1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn validation_happens_at_construction() {
        let err = Cut::new("bad", CutParams::new(), MinScalar).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn with_param_shares_predicate() {
        let base = Cut::new("x", CutParams::new().with("min", 1.5), MinScalar).unwrap();
        let tighter = base.with_param("min", 2.5).unwrap();
        let CutMask::Events(a) = base.evaluate(&table()).unwrap() else { panic!() };
        let CutMask::Events(b) = tighter.evaluate(&table()).unwrap() else { panic!() };
        assert_eq!(a.as_slice(), &[false, true, true]);
        assert_eq!(b.as_slice(), &[false, false, true]);
        assert_eq!(base.params().number("min").unwrap(), 1.5);
        assert!(base.with_param("min", "Inf").is_err());
    }

    #[test]
    fn display_lists_params() {
        let c = Cut::new("x", CutParams::new().with("min", 2), MinScalar).unwrap();
        assert_eq!(c.to_string(), "x [min_scalar] {min: 2}");
        assert_eq!(c.renamed("y").name(), "y");
    }
}
