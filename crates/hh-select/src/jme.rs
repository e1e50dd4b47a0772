//! Object-level binning cuts for jet response studies.
//!
//! These cuts act on every object of a collection rather than on events:
//! they return a per-object mask, and a NaN in the binned field is treated
//! as a defect and reported as [`hh_core::Error::UndefinedMask`].

use hh_core::{CutParams, Error, ObjectMask, ParamValue, Result};
use hh_events::EventTable;

use crate::cuts::{Cut, CutFunction, CutMask};

/// Sentinel accepted for an open upper pT edge.
pub const OPEN_EDGE: &str = "Inf";

/// Upper edge of a pT bin.
#[derive(Debug, Clone, Copy, PartialEq)]
enum UpperEdge {
    Open,
    Closed(f64),
}

fn upper_edge(params: &CutParams) -> Result<UpperEdge> {
    match params.get("pt_high") {
        Some(ParamValue::Number(v)) => Ok(UpperEdge::Closed(*v)),
        Some(ParamValue::Text(s)) if s == OPEN_EDGE => Ok(UpperEdge::Open),
        Some(ParamValue::Text(s)) => {
            Err(Error::Config(format!("unsupported pt_high value \"{s}\" (only \"{OPEN_EDGE}\")")))
        }
        None => Err(Error::Config("missing parameter 'pt_high'".into())),
    }
}

fn object_bin(
    events: &EventTable,
    collection: &str,
    field: &str,
    origin: &str,
    pass: impl Fn(f64) -> bool,
) -> Result<CutMask> {
    let coll = events.collection(collection)?;
    let flat = coll.field(field)?.iter().map(|&v| (!v.is_nan()).then(|| pass(v))).collect();
    let mask = ObjectMask::from_optional(flat, coll.offsets().to_vec(), origin)?;
    Ok(CutMask::Objects { collection: collection.to_string(), mask })
}

/// `pt_low < pt < pt_high` on every object of a collection; `pt_high` may be `"Inf"`.
#[derive(Debug, Clone)]
pub struct PtBin {
    /// Collection whose objects are binned.
    pub collection: String,
}

impl CutFunction for PtBin {
    fn name(&self) -> &str {
        "ptbin"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["pt_low"]
    }

    fn validate(&self, params: &CutParams) -> Result<()> {
        params.number("pt_low")?;
        upper_edge(params).map(|_| ())
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let low = params.number("pt_low")?;
        let high = upper_edge(params)?;
        object_bin(events, &self.collection, "pt", "ptbin", |pt| match high {
            UpperEdge::Open => pt > low,
            UpperEdge::Closed(h) => pt > low && pt < h,
        })
    }
}

/// `eta_low < eta < eta_high` on every object of a collection.
#[derive(Debug, Clone)]
pub struct EtaBin {
    /// Collection whose objects are binned.
    pub collection: String,
}

impl CutFunction for EtaBin {
    fn name(&self) -> &str {
        "etabin"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["eta_low", "eta_high"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let low = params.number("eta_low")?;
        let high = params.number("eta_high")?;
        object_bin(events, &self.collection, "eta", "etabin", |eta| eta > low && eta < high)
    }
}

fn edge_label(v: &ParamValue) -> String {
    match v {
        ParamValue::Number(x) => x.to_string(),
        ParamValue::Text(s) => s.clone(),
    }
}

/// pT bin on generator jets, named `pt{low}to{high}` unless `name` is given.
pub fn ptbin(pt_low: f64, pt_high: impl Into<ParamValue>, name: Option<&str>) -> Result<Cut> {
    let pt_high = pt_high.into();
    let name = name.map(str::to_string).unwrap_or_else(|| format!("pt{pt_low}to{}", edge_label(&pt_high)));
    let params = CutParams::new().with("pt_low", pt_low).with("pt_high", pt_high);
    Cut::new(name, params, PtBin { collection: "GenJet".into() })
}

/// η bin on reco jets, named `eta{low}to{high}` unless `name` is given.
pub fn etabin(eta_low: f64, eta_high: f64, name: Option<&str>) -> Result<Cut> {
    let name = name.map(str::to_string).unwrap_or_else(|| format!("eta{eta_low}to{eta_high}"));
    let params = CutParams::new().with("eta_low", eta_low).with("eta_high", eta_high);
    Cut::new(name, params, EtaBin { collection: "Jet".into() })
}

/// One pT bin per consecutive pair of `edges`, plus an open bin above the
/// last edge when `open_last` is set.
pub fn ptbins(edges: &[f64], open_last: bool) -> Result<Vec<Cut>> {
    let mut cuts = edges.windows(2).map(|w| ptbin(w[0], w[1], None)).collect::<Result<Vec<_>>>()?;
    if open_last && let Some(&last) = edges.last() {
        cuts.push(ptbin(last, OPEN_EDGE, None)?);
    }
    Ok(cuts)
}
