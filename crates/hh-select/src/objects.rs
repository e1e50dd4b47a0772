//! Object preselection: per-object threshold profiles that turn a raw
//! collection into a good-object collection.
//!
//! The profile is chosen explicitly when the selection is built, and every
//! threshold it needs is resolved at that point, so a missing or malformed
//! threshold is reported before any chunk is processed.

use std::collections::BTreeMap;

use hh_core::{CutParams, Error, ObjectMask, ParamValue, Result};
use hh_events::{EventTable, ObjectCollection};
use serde::{Deserialize, Serialize};

/// |η| boundary between the barrel and endcap lepton impact-parameter cuts.
pub const BARREL_ETA: f64 = 1.479;

/// Per-object-type threshold sets, keyed by output collection name
/// (`JetGood`, `JetGoodVBF`, `Electron`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPreselection(BTreeMap<String, CutParams>);

impl ObjectPreselection {
    /// Empty preselection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of one object type's thresholds.
    pub fn with(mut self, object: impl Into<String>, thresholds: CutParams) -> Self {
        self.0.insert(object.into(), thresholds);
        self
    }

    /// Thresholds for one object type.
    pub fn get(&self, object: &str) -> Result<&CutParams> {
        self.0.get(object).ok_or_else(|| {
            Error::Config(format!("no object_preselection entry for '{object}'"))
        })
    }

    /// Object type names.
    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Jet threshold profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JetProfile {
    /// Central jets: `pt`, `|eta| < eta`, `jetId`, `btagPNetB` lower bound.
    Central,
    /// Forward VBF candidates: `pt`, `eta_min < |eta| < eta_max`, `jetId`.
    VbfForward,
    /// General forward selection: `pt`, `|eta| < eta`, `jetId`, `btagPNetB` lower bound.
    GeneralForward,
    /// Generator-level jets: `pt`, `|eta| < eta`.
    Kinematic,
}

impl JetProfile {
    /// Threshold names this profile reads.
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            JetProfile::Central | JetProfile::GeneralForward => {
                &["pt", "eta", "jetId", "btagPNetB"]
            }
            JetProfile::VbfForward => &["pt", "eta_min", "eta_max", "jetId"],
            JetProfile::Kinematic => &["pt", "eta"],
        }
    }
}

/// A resolved jet preselection.
#[derive(Debug, Clone, PartialEq)]
pub struct JetSelection {
    profile: JetProfile,
    source: String,
    pt_min: f64,
    abs_eta_min: Option<f64>,
    abs_eta_max: f64,
    jet_id_min: Option<f64>,
    btag_min: Option<f64>,
}

impl JetSelection {
    /// Resolve `thresholds` for `profile`, reading jets from the `source` collection.
    pub fn new(profile: JetProfile, source: impl Into<String>, thresholds: &CutParams) -> Result<Self> {
        let source = source.into();
        let ctx = |e: Error| Error::Config(format!("jet preselection ({profile:?}, '{source}'): {e}"));
        let pt_min = thresholds.number("pt").map_err(ctx)?;
        let (abs_eta_min, abs_eta_max) = match profile {
            JetProfile::VbfForward => {
                let lo = thresholds.number("eta_min").map_err(ctx)?;
                let hi = thresholds.number("eta_max").map_err(ctx)?;
                if lo >= hi {
                    return Err(Error::Config(format!(
                        "jet preselection ('{source}'): eta_min ({lo}) must be below eta_max ({hi})"
                    )));
                }
                (Some(lo), hi)
            }
            _ => (None, thresholds.number("eta").map_err(ctx)?),
        };
        let jet_id_min = match profile {
            JetProfile::Kinematic => None,
            _ => Some(thresholds.number("jetId").map_err(ctx)?),
        };
        let btag_min = match profile {
            JetProfile::Central | JetProfile::GeneralForward => {
                Some(thresholds.number("btagPNetB").map_err(ctx)?)
            }
            _ => None,
        };
        Ok(Self { profile, source, pt_min, abs_eta_min, abs_eta_max, jet_id_min, btag_min })
    }

    /// Profile of this selection.
    pub fn profile(&self) -> JetProfile {
        self.profile
    }

    /// Raw collection the selection reads.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Per-object pass/fail for `jets`.
    pub fn mask(&self, jets: &ObjectCollection) -> Result<ObjectMask> {
        let pt = jets.field("pt")?;
        let eta = jets.field("eta")?;
        let jet_id = match self.jet_id_min {
            Some(_) => Some(jets.field("jetId")?),
            None => None,
        };
        let btag = match self.btag_min {
            Some(_) => Some(jets.field("btagPNetB")?),
            None => None,
        };
        let flat = (0..jets.len())
            .map(|i| {
                let abs_eta = eta[i].abs();
                pt[i] > self.pt_min
                    && abs_eta < self.abs_eta_max
                    && self.abs_eta_min.is_none_or(|lo| abs_eta > lo)
                    && jet_id.zip(self.jet_id_min).is_none_or(|(id, min)| id[i] >= min)
                    && btag.zip(self.btag_min).is_none_or(|(b, min)| b[i] > min)
            })
            .collect();
        ObjectMask::new(flat, jets.offsets().to_vec())
    }

    /// Filter `jets` (non-destructive).
    pub fn apply(&self, jets: &ObjectCollection) -> Result<ObjectCollection> {
        jets.filter(&self.mask(jets)?)
    }

    /// Filter the source collection of `events`.
    pub fn select(&self, events: &EventTable) -> Result<ObjectCollection> {
        self.apply(events.collection(&self.source)?)
    }
}

/// Lepton flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeptonFlavour {
    /// Electrons.
    Electron,
    /// Muons.
    Muon,
}

impl LeptonFlavour {
    /// Raw collection name.
    pub fn collection(self) -> &'static str {
        match self {
            LeptonFlavour::Electron => "Electron",
            LeptonFlavour::Muon => "Muon",
        }
    }
}

/// A resolved lepton preselection.
#[derive(Debug, Clone, PartialEq)]
pub struct LeptonSelection {
    flavour: LeptonFlavour,
    pt_min: f64,
    abs_eta_max: f64,
    iso_max: f64,
    id_field: String,
    dxy_barrel: f64,
    dxy_endcap: f64,
    dz_barrel: f64,
    dz_endcap: f64,
}

impl LeptonSelection {
    /// Resolve the thresholds of one lepton flavour.
    ///
    /// `id` names the boolean identification field that must be set.
    pub fn new(flavour: LeptonFlavour, thresholds: &CutParams) -> Result<Self> {
        let ctx = |e: Error| Error::Config(format!("{} preselection: {e}", flavour.collection()));
        let id_field = match thresholds.get("id") {
            Some(ParamValue::Text(s)) => s.clone(),
            Some(other) => {
                return Err(Error::Config(format!(
                    "{} preselection: 'id' must name a field, got {other}",
                    flavour.collection()
                )));
            }
            None => return Err(ctx(Error::Config("missing parameter 'id'".into()))),
        };
        Ok(Self {
            flavour,
            pt_min: thresholds.number("pt").map_err(ctx)?,
            abs_eta_max: thresholds.number("eta").map_err(ctx)?,
            iso_max: thresholds.number("iso").map_err(ctx)?,
            id_field,
            dxy_barrel: thresholds.number("dxy_barrel").map_err(ctx)?,
            dxy_endcap: thresholds.number("dxy_endcap").map_err(ctx)?,
            dz_barrel: thresholds.number("dz_barrel").map_err(ctx)?,
            dz_endcap: thresholds.number("dz_endcap").map_err(ctx)?,
        })
    }

    /// Flavour of this selection.
    pub fn flavour(&self) -> LeptonFlavour {
        self.flavour
    }

    /// Per-object pass/fail for `leptons`.
    pub fn mask(&self, leptons: &ObjectCollection) -> Result<ObjectMask> {
        let pt = leptons.field("pt")?;
        let eta = leptons.field("eta")?;
        let iso = leptons.field("pfRelIso03_all")?;
        let dxy = leptons.field("dxy")?;
        let dz = leptons.field("dz")?;
        let id = leptons.field(&self.id_field)?;
        let flat = (0..leptons.len())
            .map(|i| {
                let barrel = eta[i].abs() < BARREL_ETA;
                let (dxy_max, dz_max) = if barrel {
                    (self.dxy_barrel, self.dz_barrel)
                } else {
                    (self.dxy_endcap, self.dz_endcap)
                };
                eta[i].abs() < self.abs_eta_max
                    && pt[i] > self.pt_min
                    && iso[i] < self.iso_max
                    && dxy[i] < dxy_max
                    && dz[i] < dz_max
                    && id[i] > 0.5
            })
            .collect();
        ObjectMask::new(flat, leptons.offsets().to_vec())
    }

    /// Filter the raw lepton collection of `events`.
    pub fn select(&self, events: &EventTable) -> Result<ObjectCollection> {
        let leptons = events.collection(self.flavour.collection())?;
        leptons.filter(&self.mask(leptons)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jets() -> ObjectCollection {
        ObjectCollection::from_rows(&[
            ("pt", vec![vec![50.0, 40.0, 35.0, 20.0]]),
            ("eta", vec![vec![0.5, -3.2, 2.8, 0.1]]),
            ("jetId", vec![vec![6.0, 6.0, 2.0, 6.0]]),
            ("btagPNetB", vec![vec![0.8, 0.0, 0.3, 0.9]]),
        ])
        .unwrap()
    }

    fn central() -> CutParams {
        CutParams::new().with("pt", 25).with("eta", 2.5).with("jetId", 6).with("btagPNetB", 0.1)
    }

    #[test]
    fn central_profile() {
        let sel = JetSelection::new(JetProfile::Central, "Jet", &central()).unwrap();
        let good = sel.apply(&jets()).unwrap();
        assert_eq!(good.row("pt", 0).unwrap(), &[50.0]);
    }

    #[test]
    fn vbf_forward_band_excludes_central() {
        let p = CutParams::new().with("pt", 25).with("eta_min", 2.5).with("eta_max", 4.7).with("jetId", 2);
        let sel = JetSelection::new(JetProfile::VbfForward, "Jet", &p).unwrap();
        let good = sel.apply(&jets()).unwrap();
        assert_eq!(good.row("eta", 0).unwrap(), &[-3.2, 2.8]);
    }

    #[test]
    fn general_forward_keeps_btag_lower_bound() {
        let p = CutParams::new().with("pt", 30).with("eta", 4.7).with("jetId", 2).with("btagPNetB", 0.2);
        let sel = JetSelection::new(JetProfile::GeneralForward, "Jet", &p).unwrap();
        let good = sel.apply(&jets()).unwrap();
        assert_eq!(good.row("pt", 0).unwrap(), &[50.0, 35.0]);
    }

    #[test]
    fn missing_threshold_fails_at_build_time() {
        let p = CutParams::new().with("pt", 25).with("eta", 2.5);
        let err = JetSelection::new(JetProfile::Central, "Jet", &p).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("jetId"));

        let bad = CutParams::new().with("pt", 25).with("eta_min", 3.0).with("eta_max", 2.0).with("jetId", 2);
        assert!(JetSelection::new(JetProfile::VbfForward, "Jet", &bad).is_err());
    }

    #[test]
    fn kinematic_profile_ignores_tagger_fields() {
        let gen_jets = ObjectCollection::from_rows(&[
            ("pt", vec![vec![30.0, 10.0]]),
            ("eta", vec![vec![1.0, 0.0]]),
        ])
        .unwrap();
        let p = CutParams::new().with("pt", 15).with("eta", 5.0);
        let sel = JetSelection::new(JetProfile::Kinematic, "GenJet", &p).unwrap();
        assert_eq!(sel.apply(&gen_jets).unwrap().counts(), vec![1]);
    }

    #[test]
    fn lepton_barrel_endcap_impact_parameters() {
        let electrons = ObjectCollection::from_rows(&[
            ("pt", vec![vec![30.0, 30.0, 30.0]]),
            ("eta", vec![vec![0.5, 2.0, 2.0]]),
            ("pfRelIso03_all", vec![vec![0.05, 0.05, 0.05]]),
            ("dxy", vec![vec![0.04, 0.08, 0.12]]),
            ("dz", vec![vec![0.05, 0.15, 0.15]]),
            ("mvaIso_WP90", vec![vec![1.0, 1.0, 1.0]]),
        ])
        .unwrap();
        let p = CutParams::new()
            .with("pt", 15)
            .with("eta", 2.5)
            .with("iso", 0.3)
            .with("id", "mvaIso_WP90")
            .with("dxy_barrel", 0.05)
            .with("dxy_endcap", 0.1)
            .with("dz_barrel", 0.1)
            .with("dz_endcap", 0.2);
        let sel = LeptonSelection::new(LeptonFlavour::Electron, &p).unwrap();
        let m = sel.mask(&electrons).unwrap();
        assert_eq!(m.flat, vec![true, true, false]);
    }

    #[test]
    fn lepton_id_must_be_a_field_name() {
        let p = CutParams::new().with("id", 1);
        assert!(LeptonSelection::new(LeptonFlavour::Muon, &p).is_err());
    }
}
