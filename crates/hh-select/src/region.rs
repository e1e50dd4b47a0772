//! Regions (conjunctions of cuts), category layouts and cutflows.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use hh_core::{Error, Mask, ObjectMask, Result};
use hh_events::EventTable;
use serde::{Deserialize, Serialize};

use crate::cuts::{Cut, CutMask};
use crate::registry::CutRegistry;

/// Result of evaluating a region on one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    /// Events passing every event-level cut.
    pub events: Mask,
    /// AND of the object-level cuts, per collection.
    pub objects: BTreeMap<String, ObjectMask>,
}

impl RegionMask {
    fn pass_all(n_events: usize) -> Self {
        Self { events: Mask::all(n_events), objects: BTreeMap::new() }
    }

    fn add(&mut self, mask: CutMask) -> Result<()> {
        match mask {
            CutMask::Events(m) => self.events = self.events.and(&m)?,
            CutMask::Objects { collection, mask } => {
                let merged = match self.objects.remove(&collection) {
                    Some(prev) => prev.and(&mask)?,
                    None => mask,
                };
                self.objects.insert(collection, merged);
            }
        }
        Ok(())
    }
}

/// A named, ordered list of cuts; an event belongs to the region iff every
/// cut passes.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    cuts: Vec<Cut>,
}

impl Region {
    /// New region. An empty cut list selects every event.
    pub fn new(name: impl Into<String>, cuts: Vec<Cut>) -> Self {
        Self { name: name.into(), cuts }
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constituent cuts.
    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    /// Evaluate every cut on the full chunk and AND the results.
    pub fn evaluate(&self, events: &EventTable) -> Result<RegionMask> {
        let mut out = RegionMask::pass_all(events.n_events());
        for cut in &self.cuts {
            out.add(cut.evaluate(events)?)?;
        }
        Ok(out)
    }
}

/// Masks of one chunk for the preselection and every category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMasks {
    /// Events passing the preselection.
    pub preselection: Mask,
    /// Per category, already ANDed with the preselection.
    pub regions: Vec<(String, RegionMask)>,
}

impl CategoryMasks {
    /// Mask of a category by name.
    pub fn get(&self, name: &str) -> Option<&RegionMask> {
        self.regions.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }
}

/// Preselection plus named categories.
///
/// Categories are not mutually exclusive; an event may enter several.
#[derive(Debug, Clone, Default)]
pub struct Categories {
    preselection: Vec<Cut>,
    regions: Vec<Region>,
}

impl Categories {
    /// Build from a preselection and regions; region names must be unique.
    pub fn new(preselection: Vec<Cut>, regions: Vec<Region>) -> Result<Self> {
        let mut seen = std::collections::BTreeSet::new();
        for r in &regions {
            if !seen.insert(r.name()) {
                return Err(Error::Config(format!("category '{}' defined twice", r.name())));
            }
        }
        Ok(Self { preselection, regions })
    }

    /// The VBF HH→4b layout: `4b_region`, `4b_VBF_region`, and for each
    /// QvG working point 0.5–0.9 `4b_VBF_0{i}qvg_region` and
    /// `4b_VBF_0{i}qvg_generalSelection_region`; `2b_region` on request.
    pub fn hh4b(registry: &CutRegistry, include_2b: bool) -> Result<Self> {
        let four_b = registry.get("hh4b_4b_region")?;
        let vbf = registry.get("VBF_region")?;
        let general = registry.get("VBF_generalSelection_region")?;

        let mut regions = vec![
            Region::new("4b_region", vec![four_b.clone()]),
            Region::new("4b_VBF_region", vec![four_b.clone(), vbf.clone()]),
        ];
        for i in 5..=9 {
            let qvg = registry.get(&format!("qvg_0{i}_region"))?;
            regions.push(Region::new(
                format!("4b_VBF_0{i}qvg_region"),
                vec![four_b.clone(), vbf.clone(), qvg.clone()],
            ));
        }
        for i in 5..=9 {
            let qvg = registry.get(&format!("qvg_0{i}_region"))?;
            regions.push(Region::new(
                format!("4b_VBF_0{i}qvg_generalSelection_region"),
                vec![four_b.clone(), general.clone(), qvg.clone()],
            ));
        }
        if include_2b {
            regions.push(Region::new("2b_region", vec![registry.get("hh4b_2b_region")?.clone()]));
        }
        Self::new(vec![registry.get("hh4b_presel")?.clone()], regions)
    }

    /// Preselection cuts.
    pub fn preselection(&self) -> &[Cut] {
        &self.preselection
    }

    /// Categories in definition order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Evaluate the preselection and all categories on one chunk.
    pub fn evaluate(&self, events: &EventTable) -> Result<CategoryMasks> {
        let presel = Region::new("preselection", self.preselection.clone()).evaluate(events)?;
        if !presel.objects.is_empty() {
            return Err(Error::Config("preselection cuts must be event-level".into()));
        }
        let regions = self
            .regions
            .iter()
            .map(|r| {
                let mut m = r.evaluate(events)?;
                m.events = m.events.and(&presel.events)?;
                Ok((r.name.clone(), m))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CategoryMasks { preselection: presel.events, regions })
    }
}

/// Event counts after each selection step, summed over chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cutflow {
    /// Events read.
    pub initial: u64,
    /// Events passing the preselection.
    pub preselection: u64,
    /// Events per category.
    pub categories: BTreeMap<String, u64>,
}

impl Cutflow {
    /// Cutflow of one chunk.
    pub fn from_masks(n_events: usize, masks: &CategoryMasks) -> Self {
        Self {
            initial: n_events as u64,
            preselection: masks.preselection.count() as u64,
            categories: masks
                .regions
                .iter()
                .map(|(name, m)| (name.clone(), m.events.count() as u64))
                .collect(),
        }
    }
}

impl AddAssign<&Cutflow> for Cutflow {
    fn add_assign(&mut self, other: &Cutflow) {
        self.initial += other.initial;
        self.preselection += other.preselection;
        for (name, n) in &other.categories {
            *self.categories.entry(name.clone()).or_default() += n;
        }
    }
}
