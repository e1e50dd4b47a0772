//! End-to-end properties of the derived stage and the standard categories
//! on randomly generated chunks.

use hh_core::CutParams;
use hh_events::{EventTable, ObjectCollection};
use hh_select::registry::scan;
use hh_select::{Categories, CutMask, CutRegistry, DerivedFields, JetProfile, JetSelection, ObjectPreselection};
use proptest::prelude::*;

type Jet = (f64, f64, f64, f64, f64, f64, f64);
type Lepton = (f64, f64, f64, f64, f64, f64);

fn preselection() -> ObjectPreselection {
    let lepton = CutParams::new()
        .with("pt", 15)
        .with("eta", 2.5)
        .with("iso", 0.15)
        .with("dxy_barrel", 0.05)
        .with("dxy_endcap", 0.1)
        .with("dz_barrel", 0.1)
        .with("dz_endcap", 0.2);
    ObjectPreselection::new()
        .with("Electron", lepton.clone().with("id", "mvaIso_WP90"))
        .with("Muon", lepton.with("id", "tightId"))
        .with("JetGood", CutParams::new().with("pt", 25).with("eta", 2.5).with("jetId", 6).with("btagPNetB", 0))
        .with(
            "JetGoodVBF",
            CutParams::new().with("pt", 25).with("eta_min", 2.5).with("eta_max", 4.7).with("jetId", 6),
        )
        .with(
            "JetVBF_generalSelection",
            CutParams::new().with("pt", 30).with("eta", 4.7).with("jetId", 6).with("btagPNetB", 0),
        )
}

fn jet() -> impl Strategy<Value = Jet> {
    (
        0.0f64..200.0,
        -5.0f64..5.0,
        -3.14f64..3.14,
        0.0f64..20.0,
        prop_oneof![Just(0.0), Just(2.0), Just(6.0)],
        0.0f64..1.0,
        0.0f64..1.0,
    )
}

fn lepton() -> impl Strategy<Value = Lepton> {
    (0.0f64..60.0, -3.0f64..3.0, 0.0f64..0.3, -0.1f64..0.1, -0.2f64..0.2, prop_oneof![Just(0.0), Just(1.0)])
}

fn chunk() -> impl Strategy<Value = (Vec<Vec<Jet>>, Vec<Vec<Lepton>>, Vec<Vec<Lepton>>)> {
    (1usize..24).prop_flat_map(|n| {
        (
            proptest::collection::vec(proptest::collection::vec(jet(), 0..9), n),
            proptest::collection::vec(proptest::collection::vec(lepton(), 0..2), n),
            proptest::collection::vec(proptest::collection::vec(lepton(), 0..2), n),
        )
    })
}

fn column<T>(rows: &[Vec<T>], f: impl Fn(&T) -> f64) -> Vec<Vec<f64>> {
    rows.iter().map(|r| r.iter().map(&f).collect()).collect()
}

fn leptons(rows: &[Vec<Lepton>], id: &str) -> ObjectCollection {
    ObjectCollection::from_rows(&[
        ("pt", column(rows, |l| l.0)),
        ("eta", column(rows, |l| l.1)),
        ("pfRelIso03_all", column(rows, |l| l.2)),
        ("dxy", column(rows, |l| l.3)),
        ("dz", column(rows, |l| l.4)),
        (id, column(rows, |l| l.5)),
    ])
    .unwrap()
}

fn raw_table(jets: &[Vec<Jet>], electrons: &[Vec<Lepton>], muons: &[Vec<Lepton>]) -> EventTable {
    let jet_coll = ObjectCollection::from_rows(&[
        ("pt", column(jets, |j| j.0)),
        ("eta", column(jets, |j| j.1)),
        ("phi", column(jets, |j| j.2)),
        ("mass", column(jets, |j| j.3)),
        ("jetId", column(jets, |j| j.4)),
        ("btagPNetB", column(jets, |j| j.5)),
        ("btagPNetQvG", column(jets, |j| j.6)),
    ])
    .unwrap();
    EventTable::new(jets.len())
        .with_collection("Jet", jet_coll)
        .unwrap()
        .with_collection("Electron", leptons(electrons, "mvaIso_WP90"))
        .unwrap()
        .with_collection("Muon", leptons(muons, "tightId"))
        .unwrap()
}

fn subset(inner: &[bool], outer: &[bool]) -> bool {
    inner.iter().zip(outer).all(|(&i, &o)| !i || o)
}

fn event_mask(m: CutMask) -> Vec<bool> {
    match m {
        CutMask::Events(m) => m.into_vec(),
        CutMask::Objects { .. } => panic!("expected an event-level mask"),
    }
}

proptest! {
    #[test]
    fn prop_categories_inside_preselection((jets, el, mu) in chunk()) {
        let events = DerivedFields::from_preselection(&preselection()).unwrap().apply(&raw_table(&jets, &el, &mu)).unwrap();
        let registry = CutRegistry::hh4b().unwrap();
        let masks = Categories::hh4b(&registry, true).unwrap().evaluate(&events).unwrap();
        prop_assert_eq!(masks.preselection.len(), jets.len());
        for (_, m) in &masks.regions {
            prop_assert!(subset(m.events.as_slice(), masks.preselection.as_slice()));
        }
    }

    #[test]
    fn prop_qvg_regions_nest((jets, el, mu) in chunk()) {
        let events = DerivedFields::from_preselection(&preselection()).unwrap().apply(&raw_table(&jets, &el, &mu)).unwrap();
        let registry = CutRegistry::hh4b().unwrap();
        let masks = Categories::hh4b(&registry, false).unwrap().evaluate(&events).unwrap();
        for family in ["4b_VBF_0{}qvg_region", "4b_VBF_0{}qvg_generalSelection_region"] {
            for i in 5..9 {
                let loose = masks.get(&family.replace("{}", &i.to_string())).unwrap();
                let tight = masks.get(&family.replace("{}", &(i + 1).to_string())).unwrap();
                prop_assert!(subset(tight.events.as_slice(), loose.events.as_slice()));
            }
        }
        let vbf = masks.get("4b_VBF_region").unwrap();
        let four_b = masks.get("4b_region").unwrap();
        prop_assert!(subset(vbf.events.as_slice(), four_b.events.as_slice()));
        prop_assert!(subset(masks.get("4b_VBF_05qvg_region").unwrap().events.as_slice(), vbf.events.as_slice()));
    }

    #[test]
    fn prop_two_b_and_four_b_disjoint((jets, el, mu) in chunk()) {
        let events = DerivedFields::from_preselection(&preselection()).unwrap().apply(&raw_table(&jets, &el, &mu)).unwrap();
        let registry = CutRegistry::hh4b().unwrap();
        let two_b = event_mask(registry.get("hh4b_2b_region").unwrap().evaluate(&events).unwrap());
        let four_b = event_mask(registry.get("hh4b_4b_region").unwrap().evaluate(&events).unwrap());
        prop_assert!(two_b.iter().zip(&four_b).all(|(&a, &b)| !(a && b)));
    }

    #[test]
    fn prop_tighter_pt_threshold_never_adds_events((jets, el, mu) in chunk(), lo in 40.0f64..120.0, step in 0.0f64..80.0) {
        let events = DerivedFields::from_preselection(&preselection()).unwrap().apply(&raw_table(&jets, &el, &mu)).unwrap();
        let registry = CutRegistry::hh4b().unwrap();
        let base = registry.get("jet_pt_presel").unwrap();
        let cuts = scan(base, "pt_jet0", &[lo, lo + step], |v| format!("pt_jet0_{v}")).unwrap();
        let loose = event_mask(cuts[0].evaluate(&events).unwrap());
        let tight = event_mask(cuts[1].evaluate(&events).unwrap());
        prop_assert!(subset(&tight, &loose));
    }

    #[test]
    fn prop_raising_any_threshold_never_adds_events((jets, el, mu) in chunk(), lo in 0.0f64..1.0, step in 0.0f64..1.0) {
        let events = DerivedFields::from_preselection(&preselection()).unwrap().apply(&raw_table(&jets, &el, &mu)).unwrap();
        let registry = CutRegistry::hh4b().unwrap();
        let thresholds = [
            ("jet_pt_presel", "pt_jet1", 150.0),
            ("jet_pt_presel", "pt_jet2", 150.0),
            ("jet_pt_presel", "pt_jet3", 150.0),
            ("jet_btag_lead_presel", "mean_pnet_jet", 1.0),
            ("hh4b_presel", "mean_pnet_jet", 1.0),
            ("jet_btag_medium_presel", "mean_pnet_jet", 1.0),
            ("jet_btag_medium_presel", "third_pnet_jet", 1.0),
            ("jet_btag_medium_presel", "fourth_pnet_jet", 1.0),
            ("hh4b_4b_region", "third_pnet_jet", 1.0),
            ("hh4b_4b_region", "fourth_pnet_jet", 1.0),
        ];
        for (key, param, scale) in thresholds {
            let base = registry.get(key).unwrap();
            let values = [lo * scale, (lo + step) * scale];
            let cuts = scan(base, param, &values, |v| format!("{param}_{v}")).unwrap();
            let loose = event_mask(cuts[0].evaluate(&events).unwrap());
            let tight = event_mask(cuts[1].evaluate(&events).unwrap());
            prop_assert!(subset(&tight, &loose), "{} / {} at {:?}", key, param, values);
        }
    }

    #[test]
    fn prop_forward_jet_selection_is_idempotent((jets, el, mu) in chunk()) {
        let raw = raw_table(&jets, &el, &mu);
        let thresholds = CutParams::new().with("pt", 25).with("eta_min", 2.5).with("eta_max", 4.7).with("jetId", 6);
        let selection = JetSelection::new(JetProfile::VbfForward, "Jet", &thresholds).unwrap();
        let once = selection.select(&raw).unwrap();
        let twice = selection.apply(&once).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.n_events(), jets.len());
        for &eta in once.field("eta").unwrap() {
            prop_assert!(eta.abs() > 2.5 && eta.abs() < 4.7);
        }
    }

    #[test]
    fn prop_derived_stage_is_pure((jets, el, mu) in chunk()) {
        let raw = raw_table(&jets, &el, &mu);
        let stage = DerivedFields::from_preselection(&preselection()).unwrap();
        let a = stage.apply(&raw).unwrap();
        let b = stage.apply(&raw).unwrap();
        prop_assert_eq!(a.scalar("nJetGood").unwrap(), b.scalar("nJetGood").unwrap());
        prop_assert_eq!(raw.collection("Jet").unwrap().len(), jets.iter().map(Vec::len).sum::<usize>());
        prop_assert!(!raw.has_collection("JetGood"));
    }
}

#[test]
fn empty_events_select_nothing() {
    let jets = vec![vec![]; 3];
    let leptons = vec![vec![]; 3];
    let events = DerivedFields::from_preselection(&preselection())
        .unwrap()
        .apply(&raw_table(&jets, &leptons, &leptons))
        .unwrap();
    let registry = CutRegistry::hh4b().unwrap();
    let masks = Categories::hh4b(&registry, true).unwrap().evaluate(&events).unwrap();
    assert_eq!(masks.preselection.count(), 0);
    assert!(masks.regions.iter().all(|(_, m)| m.events.count() == 0));
}
