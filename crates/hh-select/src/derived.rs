//! Derived-field stage: raw event table in, table with good-object
//! collections, counts and VBF pair observables out.

use hh_core::Result;
use hh_events::kinematics::{PtEtaPhiM, invariant_mass};
use hh_events::{EventTable, ObjectCollection};

use crate::objects::{
    JetProfile, JetSelection, LeptonFlavour, LeptonSelection, ObjectPreselection,
};

/// Selected electrons.
pub const ELECTRON_GOOD: &str = "ElectronGood";
/// Selected muons.
pub const MUON_GOOD: &str = "MuonGood";
/// Central good jets, ordered by pT.
pub const JET_GOOD: &str = "JetGood";
/// Leading b-tag jets, ordered by b-tag score.
pub const JET_GOOD_HIGGS: &str = "JetGoodHiggs";
/// Forward VBF candidates, ordered by pT.
pub const JET_GOOD_VBF: &str = "JetGoodVBF";
/// General forward selection, ordered by pT.
pub const JET_VBF_GENERAL: &str = "JetVBF_generalSelection";

/// Number of selected electrons.
pub const N_ELECTRON_GOOD: &str = "nElectronGood";
/// Number of selected muons.
pub const N_MUON_GOOD: &str = "nMuonGood";
/// Number of good jets.
pub const N_JET_GOOD: &str = "nJetGood";
/// Number of forward VBF candidates.
pub const N_JET_GOOD_VBF: &str = "nJetGoodVBF";
/// Number of general forward jets.
pub const N_JET_VBF_GENERAL: &str = "nJetVBF_generalSelection";

/// |Δη| between the two leading VBF candidates.
pub const DELTA_ETA: &str = "deltaEta";
/// Invariant mass of the two leading VBF candidates.
pub const JJ_MASS: &str = "jj_mass";

/// Number of b-tag-leading jets kept in [`JET_GOOD_HIGGS`].
pub const HIGGS_JETS: usize = 4;

/// The selections used to derive the good-object collections.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFields {
    electrons: LeptonSelection,
    muons: LeptonSelection,
    jets: JetSelection,
    vbf_jets: JetSelection,
    general_jets: JetSelection,
}

impl DerivedFields {
    /// Resolve every selection from the `object_preselection` thresholds.
    ///
    /// Expects entries `Electron`, `Muon`, `JetGood`, `JetGoodVBF` and
    /// `JetVBF_generalSelection`; all jets are read from the raw `Jet` collection.
    pub fn from_preselection(presel: &ObjectPreselection) -> Result<Self> {
        Ok(Self {
            electrons: LeptonSelection::new(LeptonFlavour::Electron, presel.get("Electron")?)?,
            muons: LeptonSelection::new(LeptonFlavour::Muon, presel.get("Muon")?)?,
            jets: JetSelection::new(JetProfile::Central, "Jet", presel.get(JET_GOOD)?)?,
            vbf_jets: JetSelection::new(JetProfile::VbfForward, "Jet", presel.get(JET_GOOD_VBF)?)?,
            general_jets: JetSelection::new(
                JetProfile::GeneralForward,
                "Jet",
                presel.get(JET_VBF_GENERAL)?,
            )?,
        })
    }

    /// Return a new table with all derived collections and columns added.
    pub fn apply(&self, events: &EventTable) -> Result<EventTable> {
        let electrons = self.electrons.select(events)?;
        let muons = self.muons.select(events)?;
        let jets = self.jets.select(events)?.sort_by_desc("pt")?;
        let higgs = jets.sort_by_desc("btagPNetB")?.truncate(HIGGS_JETS);
        let vbf = self.vbf_jets.select(events)?.sort_by_desc("pt")?;
        let general = self.general_jets.select(events)?.sort_by_desc("pt")?;

        let (delta_eta, mjj) = vbf_pair_observables(&vbf)?;
        log::debug!(
            "derived fields: {} good jets, {} VBF candidates in {} events",
            jets.len(),
            vbf.len(),
            events.n_events()
        );

        events
            .clone()
            .with_scalar(N_ELECTRON_GOOD, counts_f64(&electrons))?
            .with_scalar(N_MUON_GOOD, counts_f64(&muons))?
            .with_scalar(N_JET_GOOD, counts_f64(&jets))?
            .with_scalar(N_JET_GOOD_VBF, counts_f64(&vbf))?
            .with_scalar(N_JET_VBF_GENERAL, counts_f64(&general))?
            .with_scalar(DELTA_ETA, delta_eta)?
            .with_scalar(JJ_MASS, mjj)?
            .with_collection(ELECTRON_GOOD, electrons)?
            .with_collection(MUON_GOOD, muons)?
            .with_collection(JET_GOOD, jets)?
            .with_collection(JET_GOOD_HIGGS, higgs)?
            .with_collection(JET_GOOD_VBF, vbf)?
            .with_collection(JET_VBF_GENERAL, general)
    }
}

/// Per-event object counts as a scalar column.
pub fn counts_f64(collection: &ObjectCollection) -> Vec<f64> {
    collection.counts().into_iter().map(|c| c as f64).collect()
}

/// `|eta0 - eta1|` and the invariant mass of the two leading objects of a
/// pT-ordered collection. Events with fewer than two objects get NaN.
pub fn vbf_pair_observables(ordered: &ObjectCollection) -> Result<(Vec<f64>, Vec<f64>)> {
    let field = |name: &str, k: usize| ordered.field_at(name, k);
    let (pt0, pt1) = (field("pt", 0)?, field("pt", 1)?);
    let (eta0, eta1) = (field("eta", 0)?, field("eta", 1)?);
    let (phi0, phi1) = (field("phi", 0)?, field("phi", 1)?);
    let (m0, m1) = (field("mass", 0)?, field("mass", 1)?);

    let mut delta_eta = Vec::with_capacity(ordered.n_events());
    let mut mjj = Vec::with_capacity(ordered.n_events());
    for i in 0..ordered.n_events() {
        let pair = (|| {
            let a = PtEtaPhiM { pt: pt0[i]?, eta: eta0[i]?, phi: phi0[i]?, mass: m0[i]? };
            let b = PtEtaPhiM { pt: pt1[i]?, eta: eta1[i]?, phi: phi1[i]?, mass: m1[i]? };
            Some((a, b))
        })();
        match pair {
            Some((a, b)) => {
                delta_eta.push((a.eta - b.eta).abs());
                mjj.push(invariant_mass(a, b));
            }
            None => {
                delta_eta.push(f64::NAN);
                mjj.push(f64::NAN);
            }
        }
    }
    Ok((delta_eta, mjj))
}
