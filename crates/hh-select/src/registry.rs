//! Named cuts of the analysis and factories for working-point scans.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use hh_core::{CutParams, Error, ParamValue, Result};

use crate::cuts::{Cut, CutFunction};
use crate::jme::{EtaBin, PtBin};
use crate::library::{
    BtagTail, FourJet, Hh4bPreselection, JetBtagAll, JetBtagLead, JetPtGate, LeptonVeto, QvgCut,
    VbfGap, VbfGeneralSelection,
};

/// Cuts addressable by a registry key.
///
/// Keys are unique; cut names need not be (several regions share the
/// name `hh4b`).
#[derive(Debug, Clone, Default)]
pub struct CutRegistry {
    cuts: BTreeMap<String, Cut>,
}

impl CutRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cut under `key`; duplicate keys are rejected.
    pub fn register(&mut self, key: impl Into<String>, cut: Cut) -> Result<()> {
        let key = key.into();
        if self.cuts.contains_key(&key) {
            return Err(Error::Config(format!("cut '{key}' registered twice")));
        }
        self.cuts.insert(key, cut);
        Ok(())
    }

    /// Look up a cut; unknown keys are configuration errors.
    pub fn get(&self, key: &str) -> Result<&Cut> {
        self.cuts.get(key).ok_or_else(|| Error::Config(format!("unknown cut '{key}'")))
    }

    /// Resolve a list of keys.
    pub fn resolve<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<Cut>> {
        keys.iter().map(|k| self.get(k.as_ref()).cloned()).collect()
    }

    /// `(key, cut)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cut)> {
        self.cuts.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Number of registered cuts.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// The cuts of the VBF HH→4b analysis with their nominal thresholds.
    pub fn hh4b() -> Result<Self> {
        let kinematic = leading_pt_params();
        let lead = kinematic.clone().with("mean_pnet_jet", 0.65);
        let tail = |wp: f64| CutParams::new().with("third_pnet_jet", wp).with("fourth_pnet_jet", wp);
        let all = |wp: f64| {
            let mut p = lead.clone();
            for (k, v) in tail(wp).iter() {
                p.insert(k, v.clone());
            }
            p
        };

        let mut r = Self::new();
        r.register("lepton_veto_presel", Cut::new("lepton_veto", CutParams::new(), LeptonVeto)?)?;
        r.register("four_jet_presel", Cut::new("four_jet", CutParams::new().with("njet", 4), FourJet)?)?;
        r.register("jet_pt_presel", Cut::new("jet_pt_sel", kinematic, JetPtGate::default())?)?;
        r.register(
            "jet_btag_lead_presel",
            Cut::new("jet_btag_lead_sel", lead.clone(), JetBtagLead::default())?,
        )?;
        r.register(
            "jet_btag_medium_presel",
            Cut::new("jet_btag_medium_sel", all(MEDIUM_WP), JetBtagAll::default())?,
        )?;
        r.register(
            "jet_btag_loose_presel",
            Cut::new("jet_btag_loose_sel", all(LOOSE_WP), JetBtagAll::default())?,
        )?;
        r.register("hh4b_presel", Cut::new("hh4b", lead.clone(), Hh4bPreselection::default())?)?;
        r.register("hh4b_2b_region", Cut::new("hh4b", tail(MEDIUM_WP), BtagTail::two_b())?)?;
        r.register("hh4b_4b_region", Cut::new("hh4b", tail(MEDIUM_WP), BtagTail::four_b())?)?;
        r.register(
            "VBF_region",
            Cut::new("VBF", CutParams::new().with("njet_vbf", 2).with("delta_eta", 5), VbfGap)?,
        )?;
        r.register(
            "VBF_generalSelection_region",
            Cut::new(
                "4b_VBF_genSel",
                CutParams::new()
                    .with("njet_vbf", 2)
                    .with("pt_VBFjet0", 30)
                    .with("eta_product", 0)
                    .with("mjj", 250),
                VbfGeneralSelection,
            )?,
        )?;
        for (key, cut) in qvg_working_points(5..=9)? {
            r.register(key, cut)?;
        }
        Ok(r)
    }
}

/// Predicate names accepted by [`cut_function`].
pub const FUNCTIONS: [&str; 13] = [
    "lepton_veto",
    "four_jet",
    "jet_pt",
    "jet_btag_lead",
    "jet_btag_all",
    "hh4b_presel",
    "hh4b_4b",
    "hh4b_2b",
    "vbf",
    "vbf_general_selection",
    "qvg",
    "ptbin",
    "etabin",
];

/// Look up a predicate by name, reading its default collections.
pub fn cut_function(name: &str) -> Result<Arc<dyn CutFunction>> {
    let f: Arc<dyn CutFunction> = match name {
        "lepton_veto" => Arc::new(LeptonVeto),
        "four_jet" => Arc::new(FourJet),
        "jet_pt" => Arc::new(JetPtGate::default()),
        "jet_btag_lead" => Arc::new(JetBtagLead::default()),
        "jet_btag_all" => Arc::new(JetBtagAll::default()),
        "hh4b_presel" => Arc::new(Hh4bPreselection::default()),
        "hh4b_4b" => Arc::new(BtagTail::four_b()),
        "hh4b_2b" => Arc::new(BtagTail::two_b()),
        "vbf" => Arc::new(VbfGap),
        "vbf_general_selection" => Arc::new(VbfGeneralSelection),
        "qvg" => Arc::new(QvgCut::default()),
        "ptbin" => Arc::new(PtBin { collection: "GenJet".into() }),
        "etabin" => Arc::new(EtaBin { collection: "Jet".into() }),
        other => {
            return Err(Error::Config(format!(
                "unknown cut function '{other}' (known: {})",
                FUNCTIONS.join(", ")
            )));
        }
    };
    Ok(f)
}

/// Medium b-tag working point on the third/fourth jet.
pub const MEDIUM_WP: f64 = 0.2605;
/// Loose b-tag working point on the third/fourth jet.
pub const LOOSE_WP: f64 = 0.0499;

fn leading_pt_params() -> CutParams {
    CutParams::new()
        .with("njet", 4)
        .with("pt_jet0", 80)
        .with("pt_jet1", 60)
        .with("pt_jet2", 45)
        .with("pt_jet3", 35)
}

/// Quark-vs-gluon working points `0.{i}` for `i` in `tenths`.
///
/// Returns `(qvg_0{i}_region, cut named qvg0{i})` pairs sharing one predicate.
pub fn qvg_working_points(tenths: RangeInclusive<u32>) -> Result<Vec<(String, Cut)>> {
    let base = Cut::new("qvg", CutParams::new().with("qvg_cut", 0.5), QvgCut::default())?;
    tenths
        .map(|i| {
            if i > 9 {
                return Err(Error::Config(format!("qvg working point 0.{i} is not a tenth")));
            }
            let cut = base.with_param("qvg_cut", i as f64 / 10.0)?.renamed(format!("qvg0{i}"));
            Ok((format!("qvg_0{i}_region"), cut))
        })
        .collect()
}

/// Vary one parameter of `base` over `values`, naming each cut with `name`.
pub fn scan(
    base: &Cut,
    key: &str,
    values: &[f64],
    name: impl Fn(f64) -> String,
) -> Result<Vec<Cut>> {
    values
        .iter()
        .map(|&v| Ok(base.with_param(key, ParamValue::Number(v))?.renamed(name(v))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contents() {
        let r = CutRegistry::hh4b().unwrap();
        assert_eq!(r.len(), 16);
        assert_eq!(r.get("hh4b_4b_region").unwrap().name(), "hh4b");
        assert_eq!(r.get("qvg_07_region").unwrap().name(), "qvg07");
        assert_eq!(r.get("qvg_07_region").unwrap().params().number("qvg_cut").unwrap(), 0.7);
        assert_eq!(
            r.get("jet_btag_loose_presel").unwrap().params().number("third_pnet_jet").unwrap(),
            LOOSE_WP
        );
        assert!(matches!(r.get("nope"), Err(Error::Config(_))));
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut r = CutRegistry::new();
        let c = Cut::new("lepton_veto", CutParams::new(), LeptonVeto).unwrap();
        r.register("a", c.clone()).unwrap();
        assert!(r.register("a", c).is_err());
    }

    #[test]
    fn scan_varies_one_threshold() {
        let r = CutRegistry::hh4b().unwrap();
        let base = r.get("jet_btag_lead_presel").unwrap();
        let cuts = scan(base, "mean_pnet_jet", &[0.5, 0.6], |v| format!("lead{v}")).unwrap();
        assert_eq!(cuts[1].name(), "lead0.6");
        assert_eq!(cuts[1].params().number("mean_pnet_jet").unwrap(), 0.6);
        assert_eq!(cuts[1].params().number("pt_jet0").unwrap(), 80.0);
    }

    #[test]
    fn functions_by_name() {
        for name in FUNCTIONS {
            assert_eq!(cut_function(name).unwrap().name(), name);
        }
        assert!(cut_function("hh4b_3b").is_err());
        let f = cut_function("ptbin").unwrap();
        let cut = Cut::from_shared("pt30toInf", CutParams::new().with("pt_low", 30).with("pt_high", "Inf"), f);
        assert!(cut.is_ok());
    }

    #[test]
    fn qvg_points_outside_tenths_rejected() {
        assert!(qvg_working_points(9..=10).is_err());
    }
}
