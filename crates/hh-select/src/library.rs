//! Cut functions of the HH→4b and VBF selections.
//!
//! All functions read the good-object collections and counts produced by
//! [`crate::derived::DerivedFields`]. Every function resolves absent entries
//! to `false` before returning, so a region never sees an undefined event.

use hh_core::{CutParams, Mask, OptionalMask, Result};
use hh_events::EventTable;

use crate::cuts::{CutFunction, CutMask};
use crate::derived::{
    DELTA_ETA, JET_GOOD, JET_GOOD_HIGGS, JET_GOOD_VBF, JET_VBF_GENERAL, JJ_MASS, N_ELECTRON_GOOD,
    N_JET_GOOD, N_JET_GOOD_VBF, N_JET_VBF_GENERAL, N_MUON_GOOD,
};
use crate::predicates::{
    Comparator, compare, count_at_least, count_zero, leading_gate, leading_mean, pair_product,
    positional_optional, scalar_compare,
};

const BTAG: &str = "btagPNetB";
const QVG: &str = "btagPNetQvG";
const PT_PARAMS: [&str; 4] = ["pt_jet0", "pt_jet1", "pt_jet2", "pt_jet3"];

fn lepton_veto_mask(events: &EventTable) -> Result<Mask> {
    count_zero(events, N_ELECTRON_GOOD)?.and(&count_zero(events, N_MUON_GOOD)?)
}

fn multiplicity_veto_mask(events: &EventTable, params: &CutParams) -> Result<Mask> {
    count_at_least(events, N_JET_GOOD, params.count("njet")?)?.and(&lepton_veto_mask(events)?)
}

/// pT of the four leading jets (ordered by pT) against `pt_jet0..3`,
/// restricted to events passing the multiplicity + lepton veto.
fn leading_pt_gate(events: &EventTable, jets: &str, params: &CutParams) -> Result<OptionalMask> {
    let presel = multiplicity_veto_mask(events, params)?;
    let by_pt = events.collection(jets)?.sort_by_desc("pt")?;
    let thresholds = PT_PARAMS.iter().map(|k| params.number(k)).collect::<Result<Vec<_>>>()?;
    leading_gate(&by_pt, "pt", Comparator::Greater, &thresholds)?.restrict(&presel)
}

/// Mean b-tag score of the first two jets (as stored) above `mean_pnet_jet`.
fn lead_btag_mean(events: &EventTable, jets: &str, params: &CutParams) -> Result<OptionalMask> {
    let mean = leading_mean(events.collection(jets)?, BTAG, 2)?;
    Ok(compare(&mean, Comparator::Greater, params.number("mean_pnet_jet")?))
}

/// Third and fourth b-tag scores (as stored) compared against `third_pnet_jet`
/// and `fourth_pnet_jet`.
fn btag_tail(
    events: &EventTable,
    jets: &str,
    cmp: Comparator,
    params: &CutParams,
) -> Result<OptionalMask> {
    let coll = events.collection(jets)?;
    let third = positional_optional(coll, BTAG, 2, cmp, params.number("third_pnet_jet")?)?;
    let fourth = positional_optional(coll, BTAG, 3, cmp, params.number("fourth_pnet_jet")?)?;
    third.and(&fourth)
}

/// No selected electrons and no selected muons.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeptonVeto;

impl CutFunction for LeptonVeto {
    fn name(&self) -> &str {
        "lepton_veto"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &[]
    }

    fn apply(&self, events: &EventTable, _params: &CutParams) -> Result<CutMask> {
        Ok(CutMask::Events(lepton_veto_mask(events)?))
    }
}

/// At least `njet` good jets and the lepton veto.
#[derive(Debug, Clone, Copy, Default)]
pub struct FourJet;

impl CutFunction for FourJet {
    fn name(&self) -> &str {
        "four_jet"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["njet"]
    }

    fn validate(&self, params: &CutParams) -> Result<()> {
        params.count("njet").map(|_| ())
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        Ok(CutMask::Events(multiplicity_veto_mask(events, params)?))
    }
}

/// Multiplicity + lepton veto, then the four leading jets above
/// `pt_jet0..pt_jet3`.
#[derive(Debug, Clone)]
pub struct JetPtGate {
    /// Jet collection to order by pT.
    pub jets: String,
}

impl Default for JetPtGate {
    fn default() -> Self {
        Self { jets: JET_GOOD_HIGGS.into() }
    }
}

impl CutFunction for JetPtGate {
    fn name(&self) -> &str {
        "jet_pt"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["njet", "pt_jet0", "pt_jet1", "pt_jet2", "pt_jet3"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        Ok(CutMask::Events(leading_pt_gate(events, &self.jets, params)?.fill_none(false)))
    }
}

/// [`JetPtGate`] plus the mean b-tag score of the two leading b-tag jets
/// above `mean_pnet_jet`.
#[derive(Debug, Clone)]
pub struct JetBtagLead {
    /// Jet collection, ordered by b-tag score.
    pub jets: String,
}

impl Default for JetBtagLead {
    fn default() -> Self {
        Self { jets: JET_GOOD_HIGGS.into() }
    }
}

impl CutFunction for JetBtagLead {
    fn name(&self) -> &str {
        "jet_btag_lead"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["njet", "pt_jet0", "pt_jet1", "pt_jet2", "pt_jet3", "mean_pnet_jet"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let pt = leading_pt_gate(events, &self.jets, params)?;
        let btag = lead_btag_mean(events, &self.jets, params)?;
        Ok(CutMask::Events(pt.and(&btag)?.fill_none(false)))
    }
}

/// [`JetBtagLead`] plus third and fourth b-tag scores above
/// `third_pnet_jet` / `fourth_pnet_jet`. The medium and loose working
/// points differ only in those two thresholds.
#[derive(Debug, Clone)]
pub struct JetBtagAll {
    /// Jet collection, ordered by b-tag score.
    pub jets: String,
}

impl Default for JetBtagAll {
    fn default() -> Self {
        Self { jets: JET_GOOD_HIGGS.into() }
    }
}

impl CutFunction for JetBtagAll {
    fn name(&self) -> &str {
        "jet_btag_all"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &[
            "njet",
            "pt_jet0",
            "pt_jet1",
            "pt_jet2",
            "pt_jet3",
            "mean_pnet_jet",
            "third_pnet_jet",
            "fourth_pnet_jet",
        ]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let pt = leading_pt_gate(events, &self.jets, params)?;
        let lead = lead_btag_mean(events, &self.jets, params)?;
        let tail = btag_tail(events, &self.jets, Comparator::Greater, params)?;
        Ok(CutMask::Events(pt.and(&lead)?.and(&tail)?.fill_none(false)))
    }
}

/// HH→4b preselection: multiplicity + lepton veto, leading-jet pT gate and
/// the mean b-tag score of the two leading-pT good jets.
#[derive(Debug, Clone)]
pub struct Hh4bPreselection {
    /// Good-jet collection, ordered by pT.
    pub jets: String,
}

impl Default for Hh4bPreselection {
    fn default() -> Self {
        Self { jets: JET_GOOD.into() }
    }
}

impl CutFunction for Hh4bPreselection {
    fn name(&self) -> &str {
        "hh4b_presel"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["njet", "pt_jet0", "pt_jet1", "pt_jet2", "pt_jet3", "mean_pnet_jet"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let pt = leading_pt_gate(events, &self.jets, params)?.fill_none(false);
        let btag = lead_btag_mean(events, &self.jets, params)?.fill_none(false);
        Ok(CutMask::Events(pt.and(&btag)?))
    }
}

/// Third and fourth b-tag scores on one side of their thresholds.
///
/// [`BtagTail::four_b`] (both above) and [`BtagTail::two_b`] (both below)
/// never select the same event. Both comparisons are strict, so a score
/// exactly at threshold falls in neither.
#[derive(Debug, Clone)]
pub struct BtagTail {
    /// Jet collection, ordered by b-tag score.
    pub jets: String,
    cmp: Comparator,
}

impl BtagTail {
    /// Signal-enriched region: both scores above threshold.
    pub fn four_b() -> Self {
        Self { jets: JET_GOOD_HIGGS.into(), cmp: Comparator::Greater }
    }

    /// Control region: both scores below threshold.
    pub fn two_b() -> Self {
        Self { jets: JET_GOOD_HIGGS.into(), cmp: Comparator::Less }
    }
}

impl CutFunction for BtagTail {
    fn name(&self) -> &str {
        match self.cmp {
            Comparator::Greater | Comparator::GreaterEq => "hh4b_4b",
            Comparator::Less | Comparator::LessEq => "hh4b_2b",
        }
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["third_pnet_jet", "fourth_pnet_jet"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        Ok(CutMask::Events(btag_tail(events, &self.jets, self.cmp, params)?.fill_none(false)))
    }
}

/// At least `njet_vbf` forward candidates and `deltaEta > delta_eta`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VbfGap;

impl CutFunction for VbfGap {
    fn name(&self) -> &str {
        "vbf"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["njet_vbf", "delta_eta"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let enough = count_at_least(events, N_JET_GOOD_VBF, params.count("njet_vbf")?)?;
        let gap = scalar_compare(events, DELTA_ETA, Comparator::Greater, params.number("delta_eta")?)?;
        Ok(CutMask::Events(gap.and_mask(&enough)?.fill_none(false)))
    }
}

/// General VBF selection: at least `njet_vbf` candidates, leading candidate
/// above `pt_VBFjet0`, the two leading candidates in opposite hemispheres
/// (`eta0 * eta1 < eta_product`) and `jj_mass > mjj`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VbfGeneralSelection;

impl CutFunction for VbfGeneralSelection {
    fn name(&self) -> &str {
        "vbf_general_selection"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["njet_vbf", "pt_VBFjet0", "eta_product", "mjj"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let enough = count_at_least(events, N_JET_VBF_GENERAL, params.count("njet_vbf")?)?;
        let jets = events.collection(JET_VBF_GENERAL)?;
        let by_pt = jets.sort_by_desc("pt")?;
        let pt = positional_optional(&by_pt, "pt", 0, Comparator::Greater, params.number("pt_VBFjet0")?)?
            .restrict(&enough)?
            .fill_none(false);
        let hemispheres = compare(
            &pair_product(jets, "eta", 0, 1)?,
            Comparator::Less,
            params.number("eta_product")?,
        )
        .restrict(&enough)?
        .fill_none(false);
        let mass = scalar_compare(events, JJ_MASS, Comparator::Greater, params.number("mjj")?)?
            .fill_none(false);
        Ok(CutMask::Events(pt.and(&hemispheres)?.and(&mass)?))
    }
}

/// Both leading forward candidates with quark-vs-gluon score above
/// `qvg_cut`; events with fewer than two candidates fail.
#[derive(Debug, Clone)]
pub struct QvgCut {
    /// Forward-candidate collection.
    pub jets: String,
}

impl Default for QvgCut {
    fn default() -> Self {
        Self { jets: JET_GOOD_VBF.into() }
    }
}

impl CutFunction for QvgCut {
    fn name(&self) -> &str {
        "qvg"
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["qvg_cut"]
    }

    fn apply(&self, events: &EventTable, params: &CutParams) -> Result<CutMask> {
        let thr = params.number("qvg_cut")?;
        let padded = events.collection(&self.jets)?.pad_none(QVG, 2)?;
        let first = compare(&padded.slot(0)?, Comparator::Greater, thr);
        let second = compare(&padded.slot(1)?, Comparator::Greater, thr);
        Ok(CutMask::Events(first.and(&second)?.fill_none(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hh_events::ObjectCollection;

    /// Table with JetGood == JetGoodHiggs and no leptons.
    fn four_jet_table(pt: Vec<Vec<f64>>, btag: Vec<Vec<f64>>) -> EventTable {
        let n = pt.len();
        let counts: Vec<f64> = pt.iter().map(|r| r.len() as f64).collect();
        let jets = ObjectCollection::from_rows(&[("pt", pt), (BTAG, btag)]).unwrap();
        EventTable::new(n)
            .with_collection(JET_GOOD, jets.clone())
            .unwrap()
            .with_collection(JET_GOOD_HIGGS, jets.sort_by_desc(BTAG).unwrap())
            .unwrap()
            .with_scalar(N_JET_GOOD, counts)
            .unwrap()
            .with_scalar(N_ELECTRON_GOOD, vec![0.0; n])
            .unwrap()
            .with_scalar(N_MUON_GOOD, vec![0.0; n])
            .unwrap()
    }

    fn presel_params() -> CutParams {
        CutParams::new()
            .with("njet", 4)
            .with("pt_jet0", 80)
            .with("pt_jet1", 60)
            .with("pt_jet2", 45)
            .with("pt_jet3", 35)
            .with("mean_pnet_jet", 0.65)
    }

    fn events_mask(m: CutMask) -> Vec<bool> {
        match m {
            CutMask::Events(m) => m.into_vec(),
            CutMask::Objects { .. } => panic!("expected an event mask"),
        }
    }

    #[test]
    fn three_jets_fail_four_jet_requirement() {
        let t = four_jet_table(vec![vec![90.0, 70.0, 50.0]], vec![vec![0.9, 0.9, 0.9]]);
        let p = CutParams::new().with("njet", 4);
        assert_eq!(events_mask(FourJet.apply(&t, &p).unwrap()), vec![false]);
        assert_eq!(events_mask(Hh4bPreselection::default().apply(&t, &presel_params()).unwrap()), vec![false]);
    }

    #[test]
    fn kinematic_and_lead_btag_gate_passes() {
        let t = four_jet_table(vec![vec![85.0, 65.0, 50.0, 40.0]], vec![vec![0.7, 0.7, 0.3, 0.3]]);
        let p = presel_params();
        assert_eq!(events_mask(JetBtagLead::default().apply(&t, &p).unwrap()), vec![true]);
        assert_eq!(events_mask(Hh4bPreselection::default().apply(&t, &p).unwrap()), vec![true]);
    }

    #[test]
    fn leptons_veto_the_event() {
        let t = four_jet_table(vec![vec![85.0, 65.0, 50.0, 40.0]], vec![vec![0.7, 0.7, 0.3, 0.3]])
            .with_scalar(N_MUON_GOOD, vec![1.0])
            .unwrap();
        assert_eq!(events_mask(LeptonVeto.apply(&t, &CutParams::new()).unwrap()), vec![false]);
        assert_eq!(events_mask(JetPtGate::default().apply(&t, &presel_params()).unwrap()), vec![false]);
    }

    #[test]
    fn medium_and_loose_working_points() {
        let t = four_jet_table(vec![vec![85.0, 65.0, 50.0, 40.0]], vec![vec![0.9, 0.8, 0.2, 0.1]]);
        let medium = presel_params().with("third_pnet_jet", 0.2605).with("fourth_pnet_jet", 0.2605);
        let loose = presel_params().with("third_pnet_jet", 0.0499).with("fourth_pnet_jet", 0.0499);
        assert_eq!(events_mask(JetBtagAll::default().apply(&t, &medium).unwrap()), vec![false]);
        assert_eq!(events_mask(JetBtagAll::default().apply(&t, &loose).unwrap()), vec![true]);
    }

    #[test]
    fn two_b_and_four_b_at_boundary() {
        let t = four_jet_table(
            vec![vec![85.0, 65.0, 50.0, 40.0]; 4],
            vec![
                vec![0.9, 0.9, 0.5, 0.4],
                vec![0.9, 0.9, 0.1, 0.05],
                vec![0.9, 0.9, 0.2605, 0.2605],
                vec![0.9, 0.9, 0.5, 0.1],
            ],
        );
        let p = CutParams::new().with("third_pnet_jet", 0.2605).with("fourth_pnet_jet", 0.2605);
        let four = events_mask(BtagTail::four_b().apply(&t, &p).unwrap());
        let two = events_mask(BtagTail::two_b().apply(&t, &p).unwrap());
        assert_eq!(four, vec![true, false, false, false]);
        assert_eq!(two, vec![false, true, false, false]);
    }

    #[test]
    fn vbf_gap_requires_count_and_gap() {
        let t = EventTable::new(3)
            .with_scalar(N_JET_GOOD_VBF, vec![2.0, 1.0, 2.0])
            .unwrap()
            .with_scalar(DELTA_ETA, vec![6.0, 7.0, f64::NAN])
            .unwrap();
        let p = CutParams::new().with("njet_vbf", 2).with("delta_eta", 5);
        assert_eq!(events_mask(VbfGap.apply(&t, &p).unwrap()), vec![true, false, false]);
    }

    fn vbf_general_table(eta: Vec<Vec<f64>>, pt: Vec<Vec<f64>>, mjj: Vec<f64>) -> EventTable {
        let n = eta.len();
        let counts = eta.iter().map(|r| r.len() as f64).collect();
        let jets = ObjectCollection::from_rows(&[("pt", pt), ("eta", eta)]).unwrap();
        EventTable::new(n)
            .with_collection(JET_VBF_GENERAL, jets)
            .unwrap()
            .with_scalar(N_JET_VBF_GENERAL, counts)
            .unwrap()
            .with_scalar(JJ_MASS, mjj)
            .unwrap()
    }

    #[test]
    fn same_hemisphere_fails_general_selection() {
        let t = vbf_general_table(
            vec![vec![3.0, 2.5], vec![3.0, -2.5], vec![3.0]],
            vec![vec![60.0, 40.0], vec![60.0, 40.0], vec![60.0]],
            vec![800.0, 800.0, 800.0],
        );
        let p = CutParams::new().with("njet_vbf", 2).with("pt_VBFjet0", 30).with("eta_product", 0).with("mjj", 250);
        assert_eq!(events_mask(VbfGeneralSelection.apply(&t, &p).unwrap()), vec![false, true, false]);
    }

    #[test]
    fn single_candidate_fails_qvg() {
        let jets = ObjectCollection::from_rows(&[(QVG, vec![vec![0.95], vec![0.95, 0.7], vec![]])]).unwrap();
        let t = EventTable::new(3).with_collection(JET_GOOD_VBF, jets).unwrap();
        let p = CutParams::new().with("qvg_cut", 0.6);
        assert_eq!(events_mask(QvgCut::default().apply(&t, &p).unwrap()), vec![false, true, false]);
    }
}
