//! Generator/reco jet matching for jet response studies.
//!
//! Each selected generator jet is paired with the nearest selected reco jet
//! in ΔR. Matched pairs are stored as `MatchedJets`, a copy of the
//! generator jets carrying response fields computed from their reco partner.

use hh_core::{Error, ObjectMask, Result};
use hh_events::kinematics::delta_r;
use hh_events::{EventTable, ObjectCollection};
use serde::{Deserialize, Serialize};

use crate::derived::counts_f64;
use crate::objects::{JetProfile, JetSelection, ObjectPreselection};

/// Selected reco jets.
pub const JET_GOOD: &str = "JetGood";
/// Selected generator jets.
pub const GEN_JET_GOOD: &str = "GenJetGood";
/// Matched generator jets with response fields.
pub const MATCHED_JETS: &str = "MatchedJets";
/// `reco.pt / gen.pt`.
pub const RESPONSE_JEC: &str = "ResponseJEC";
/// Response before energy corrections.
pub const RESPONSE_RAW: &str = "ResponseRaw";
/// Response with the PNet pT regression applied on top of the raw one.
pub const RESPONSE_PNET_REG: &str = "ResponsePNetReg";

/// Generator jet flavour requirement, on `|partonFlavour|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlavourSelection {
    /// No requirement.
    #[default]
    Inclusive,
    /// b quarks (5).
    B,
    /// c quarks (4).
    C,
    /// u quarks (1).
    U,
    /// d quarks (2).
    D,
    /// s quarks (3).
    S,
    /// Light quarks (1, 2, 3).
    Uds,
    /// Gluons (21).
    G,
}

impl FlavourSelection {
    /// Flavours used for per-flavour matched collections.
    pub const SPLIT: [FlavourSelection; 4] =
        [FlavourSelection::B, FlavourSelection::C, FlavourSelection::Uds, FlavourSelection::G];

    /// Accepted parton flavours; empty for [`FlavourSelection::Inclusive`].
    pub fn parton_flavours(self) -> &'static [u32] {
        match self {
            FlavourSelection::Inclusive => &[],
            FlavourSelection::B => &[5],
            FlavourSelection::C => &[4],
            FlavourSelection::U => &[1],
            FlavourSelection::D => &[2],
            FlavourSelection::S => &[3],
            FlavourSelection::Uds => &[1, 2, 3],
            FlavourSelection::G => &[21],
        }
    }

    /// Whether a jet with this `partonFlavour` passes.
    pub fn accepts(self, parton_flavour: f64) -> bool {
        self == FlavourSelection::Inclusive
            || self.parton_flavours().iter().any(|&p| f64::from(p) == parton_flavour.abs())
    }

    /// Lowercase label used in collection names.
    pub fn label(self) -> &'static str {
        match self {
            FlavourSelection::Inclusive => "inclusive",
            FlavourSelection::B => "b",
            FlavourSelection::C => "c",
            FlavourSelection::U => "u",
            FlavourSelection::D => "d",
            FlavourSelection::S => "s",
            FlavourSelection::Uds => "uds",
            FlavourSelection::G => "g",
        }
    }
}

fn default_max_delta_r() -> f64 {
    0.2
}

fn default_true() -> bool {
    true
}

/// Options of the matching workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JetMatchingConfig {
    /// Generator jet flavour requirement applied before matching.
    #[serde(default)]
    pub flavour: FlavourSelection,
    /// Also write `MatchedJets_{b,c,uds,g}`.
    #[serde(default)]
    pub flavour_split: bool,
    /// Add `ResponsePNetReg` (needs `PNetRegPtRawCorr` on reco jets).
    #[serde(default)]
    pub pnet_regression: bool,
    /// Optional `(eta_min, eta_max)` window for the binned collections.
    #[serde(default)]
    pub eta_window: Option<(f64, f64)>,
    /// pT bin edges of the binned collections.
    #[serde(default)]
    pub pt_bins: Vec<f64>,
    /// Write one matched collection per pT bin.
    #[serde(default = "default_true")]
    pub binned_collections: bool,
    /// Matching cone.
    #[serde(default = "default_max_delta_r")]
    pub max_delta_r: f64,
}

impl Default for JetMatchingConfig {
    fn default() -> Self {
        Self {
            flavour: FlavourSelection::Inclusive,
            flavour_split: false,
            pnet_regression: false,
            eta_window: None,
            pt_bins: Vec::new(),
            binned_collections: true,
            max_delta_r: default_max_delta_r(),
        }
    }
}

impl JetMatchingConfig {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_delta_r.is_nan() || self.max_delta_r <= 0.0 {
            return Err(Error::Config(format!("max_delta_r must be positive, got {}", self.max_delta_r)));
        }
        if self.pt_bins.iter().any(|v| v.is_nan()) || self.pt_bins.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(format!("pt_bins must be increasing: {:?}", self.pt_bins)));
        }
        if let Some((lo, hi)) = self.eta_window
            && (lo.is_nan() || hi.is_nan() || lo >= hi)
        {
            return Err(Error::Config(format!("eta_window ({lo}, {hi}) is empty")));
        }
        Ok(())
    }

    /// Names of the binned collections, in bin order.
    pub fn binned_names(&self) -> Vec<String> {
        if !self.binned_collections {
            return Vec::new();
        }
        self.pt_bins
            .windows(2)
            .map(|w| match self.eta_window {
                Some((a, b)) => format!("{MATCHED_JETS}_eta{a}to{b}_pt{}to{}", w[0], w[1]),
                None => format!("{MATCHED_JETS}_pt{}to{}", w[0], w[1]),
            })
            .collect()
    }
}

/// Matched pairs of one chunk as flat indices into the two collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matches {
    /// Indices into the generator collection.
    pub gen_idx: Vec<usize>,
    /// Indices into the reco collection, aligned with `gen_idx`.
    pub reco_idx: Vec<usize>,
    /// Matched pairs per event.
    pub counts: Vec<usize>,
}

/// Pair every generator jet with the nearest reco jet of the same event,
/// keeping pairs with ΔR below `max_delta_r`. A reco jet may be used twice.
pub fn object_matching(gen_jets: &ObjectCollection, reco: &ObjectCollection, max_delta_r: f64) -> Result<Matches> {
    if gen_jets.n_events() != reco.n_events() {
        return Err(Error::Validation(format!(
            "matching {} events against {}",
            gen_jets.n_events(),
            reco.n_events()
        )));
    }
    let (g_eta, g_phi) = (gen_jets.field("eta")?, gen_jets.field("phi")?);
    let (r_eta, r_phi) = (reco.field("eta")?, reco.field("phi")?);
    let mut out = Matches::default();
    for (g, r) in gen_jets.offsets().windows(2).zip(reco.offsets().windows(2)) {
        let mut n = 0;
        for gi in g[0]..g[1] {
            let nearest = (r[0]..r[1])
                .map(|ri| (ri, delta_r(g_eta[gi], g_phi[gi], r_eta[ri], r_phi[ri])))
                .filter(|(_, dr)| !dr.is_nan())
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((ri, dr)) = nearest
                && dr < max_delta_r
            {
                out.gen_idx.push(gi);
                out.reco_idx.push(ri);
                n += 1;
            }
        }
        out.counts.push(n);
    }
    Ok(out)
}

/// The matching stage: selects jets, matches them and adds the response
/// collections to an event table.
#[derive(Debug, Clone, PartialEq)]
pub struct JetMatching {
    config: JetMatchingConfig,
    jets: JetSelection,
    gen_jets: JetSelection,
}

impl JetMatching {
    /// Resolve selections from the `Jet` and `GenJet` preselection entries.
    pub fn new(config: JetMatchingConfig, presel: &ObjectPreselection) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            jets: JetSelection::new(JetProfile::Central, "Jet", presel.get("Jet")?)?,
            gen_jets: JetSelection::new(JetProfile::Kinematic, "GenJet", presel.get("GenJet")?)?,
            config,
        })
    }

    /// Options in use.
    pub fn config(&self) -> &JetMatchingConfig {
        &self.config
    }

    /// Return a new table with `JetGood`, `GenJetGood`, their counts,
    /// `MatchedJets` and the configured derived matched collections.
    pub fn apply(&self, events: &EventTable) -> Result<EventTable> {
        let jets = self.jets.select(events)?;
        let gen_jets = self.gen_jets.select(events)?;
        let candidates = match self.config.flavour {
            FlavourSelection::Inclusive => gen_jets.clone(),
            flav => gen_jets.filter(&gen_jets.object_mask("partonFlavour", |f| flav.accepts(f))?)?,
        };

        let m = object_matching(&candidates, &jets, self.config.max_delta_r)?;
        let gen_matched = candidates.take(&m.gen_idx, &m.counts)?;
        let reco_matched = jets.take(&m.reco_idx, &m.counts)?;
        log::debug!(
            "matching: {}/{} generator jets matched in {} events",
            gen_matched.len(),
            candidates.len(),
            events.n_events()
        );

        let jec: Vec<f64> =
            reco_matched.field("pt")?.iter().zip(gen_matched.field("pt")?).map(|(r, g)| r / g).collect();
        let raw: Vec<f64> =
            jec.iter().zip(reco_matched.field("rawFactor")?).map(|(j, f)| j * (1.0 - f)).collect();
        let mut matched = gen_matched.with_field(RESPONSE_JEC, jec)?;
        if self.config.pnet_regression {
            let reg = raw.iter().zip(reco_matched.field("PNetRegPtRawCorr")?).map(|(r, c)| r * c).collect();
            matched = matched.with_field(RESPONSE_PNET_REG, reg)?;
        }
        let matched = matched.with_field(RESPONSE_RAW, raw)?;

        let mut out = events
            .clone()
            .with_scalar("nJetGood", counts_f64(&jets))?
            .with_scalar("nGenJetGood", counts_f64(&gen_jets))?
            .with_collection(JET_GOOD, jets)?
            .with_collection(GEN_JET_GOOD, gen_jets)?;

        if self.config.flavour_split {
            for flav in FlavourSelection::SPLIT {
                let mask = matched.object_mask("partonFlavour", |f| flav.accepts(f))?;
                out = out.with_collection(format!("{MATCHED_JETS}_{}", flav.label()), matched.filter(&mask)?)?;
            }
        }
        let names = self.config.binned_names();
        for (w, name) in self.config.pt_bins.windows(2).zip(names) {
            let (lo, hi) = (w[0], w[1]);
            let window = self.config.eta_window;
            let pt = matched.field("pt")?;
            let eta = matched.field("eta")?;
            let flat = pt
                .iter()
                .zip(eta)
                .map(|(&p, &e)| p > lo && p < hi && window.is_none_or(|(a, b)| e > a && e < b))
                .collect();
            let mask = ObjectMask::new(flat, matched.offsets().to_vec())?;
            out = out.with_collection(name, matched.filter(&mask)?)?;
        }
        out.with_collection(MATCHED_JETS, matched)
    }
}
