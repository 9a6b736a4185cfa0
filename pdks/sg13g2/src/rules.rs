//! Design-rule constants and routing cross-sections.
//!
//! All dimensions are in micrometres.

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::layers::Sg13g2Layer;
use crate::units::GRID_UM;
use crate::{Result, Sg13g2Error};

/// Width and spacing rules for a routing metal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetalRule {
    /// Minimum line width.
    pub min_width: f64,
    /// Minimum spacing between lines.
    pub min_space: f64,
}

/// Rules for a cut layer connecting `below` to `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutRule {
    /// The metal below the cut.
    pub below: Sg13g2Layer,
    /// The metal above the cut.
    pub above: Sg13g2Layer,
    /// Edge length of a square cut.
    pub size: f64,
    /// Minimum spacing between cuts.
    pub space: f64,
    /// Enclosure of the cut by the layer below.
    pub enc_below: f64,
    /// Enclosure of the cut by the layer above.
    pub enc_above: f64,
}

impl CutRule {
    /// Center-to-center cut pitch.
    #[inline]
    pub fn pitch(&self) -> f64 {
        self.size + self.space
    }

    /// The number of cuts that fit in `span`, given the larger of the two enclosures.
    ///
    /// At least one cut is always placed.
    pub fn count(&self, span: f64) -> usize {
        let enc = self.enc_below.max(self.enc_above);
        let avail = span - 2. * enc - self.size;
        if avail < 0. {
            1
        } else {
            (avail / self.pitch() + 1e-9).floor() as usize + 1
        }
    }
}

/// The SG13G2 design-rule constants used by the parametric cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRules {
    /// Manufacturing grid.
    pub grid: f64,
    /// Rules per routing metal, bottom to top.
    pub metals: IndexMap<Sg13g2Layer, MetalRule>,
    /// Rules per cut layer, bottom to top.
    pub cuts: IndexMap<Sg13g2Layer, CutRule>,
}

impl DesignRules {
    /// The SG13G2 rule set.
    pub fn sg13g2() -> Self {
        use Sg13g2Layer::*;
        let metal = |min_width, min_space| MetalRule {
            min_width,
            min_space,
        };
        let cut = |below, above, size, space, enc_below, enc_above| CutRule {
            below,
            above,
            size,
            space,
            enc_below,
            enc_above,
        };
        Self {
            grid: GRID_UM,
            metals: IndexMap::from_iter([
                (Metal1, metal(0.16, 0.18)),
                (Metal2, metal(0.2, 0.21)),
                (Metal3, metal(0.2, 0.21)),
                (Metal4, metal(0.2, 0.21)),
                (Metal5, metal(0.2, 0.21)),
                (TopMetal1, metal(1.64, 1.64)),
                (TopMetal2, metal(2., 2.)),
            ]),
            cuts: IndexMap::from_iter([
                (Cont, cut(Activ, Metal1, 0.16, 0.18, 0.07, 0.06)),
                (Via1, cut(Metal1, Metal2, 0.19, 0.22, 0.05, 0.05)),
                (Via2, cut(Metal2, Metal3, 0.19, 0.22, 0.05, 0.05)),
                (Via3, cut(Metal3, Metal4, 0.19, 0.22, 0.05, 0.05)),
                (Via4, cut(Metal4, Metal5, 0.19, 0.22, 0.05, 0.05)),
                (TopVia1, cut(Metal5, TopMetal1, 0.42, 0.42, 0.1, 0.42)),
                (TopVia2, cut(TopMetal1, TopMetal2, 0.9, 1.06, 0.5, 0.5)),
            ]),
        }
    }

    /// The rules for a routing metal.
    pub fn metal(&self, layer: Sg13g2Layer) -> Result<&MetalRule> {
        self.metals.get(&layer).ok_or(Sg13g2Error::NoRule(layer))
    }

    /// The rules for a cut layer.
    pub fn cut(&self, layer: Sg13g2Layer) -> Result<&CutRule> {
        self.cuts.get(&layer).ok_or(Sg13g2Error::NoRule(layer))
    }

    /// The cut layer connecting metal `below` to the metal directly above it.
    pub fn cut_above(&self, below: Sg13g2Layer) -> Option<(Sg13g2Layer, &CutRule)> {
        self.cuts
            .iter()
            .find(|(_, rule)| rule.below == below)
            .map(|(layer, rule)| (*layer, rule))
    }

    /// The metals from `bottom` to `top`, inclusive.
    pub fn metals_between(
        &self,
        bottom: Sg13g2Layer,
        top: Sg13g2Layer,
    ) -> Result<Vec<Sg13g2Layer>> {
        let index = |layer: Sg13g2Layer| {
            self.metals
                .get_index_of(&layer)
                .ok_or(Sg13g2Error::NoRule(layer))
        };
        let (lo, hi) = (index(bottom)?, index(top)?);
        if lo > hi {
            return Err(Sg13g2Error::invalid_param(
                "bottom",
                arcstr::format!("{bottom} lies above {top}"),
            ));
        }
        Ok(self.metals.keys().skip(lo).take(hi - lo + 1).copied().collect())
    }
}

impl Default for DesignRules {
    fn default() -> Self {
        Self::sg13g2()
    }
}

/// A routing cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// The cross-section name.
    pub name: ArcStr,
    /// The routing layer.
    pub layer: Sg13g2Layer,
    /// Trace width.
    pub width: f64,
    /// Bend radius; `None` for Manhattan routing.
    pub radius: Option<f64>,
}

impl CrossSection {
    /// A Manhattan routing cross-section at the minimum width of `layer`.
    pub fn routing(rules: &DesignRules, layer: Sg13g2Layer) -> Result<Self> {
        Ok(Self {
            name: arcstr::format!("{}_routing", layer.name().to_lowercase()),
            layer,
            width: rules.metal(layer)?.min_width,
            radius: None,
        })
    }

    /// The default strip line on the thick top metal.
    pub fn strip() -> Self {
        Self {
            name: arcstr::literal!("strip"),
            layer: Sg13g2Layer::TopMetal2,
            width: 10.,
            radius: Some(20.),
        }
    }
}

/// All named cross-sections: one routing style per metal plus `strip`.
pub fn cross_sections(rules: &DesignRules) -> Result<Vec<CrossSection>> {
    let mut xs = Sg13g2Layer::METALS
        .into_iter()
        .map(|layer| CrossSection::routing(rules, layer))
        .collect::<Result<Vec<_>>>()?;
    xs.push(CrossSection::strip());
    Ok(xs)
}

/// Looks up a cross-section by name, e.g. `metal2_routing` or `topmetal1_routing`.
pub fn cross_section(rules: &DesignRules, name: &str) -> Result<CrossSection> {
    cross_sections(rules)?
        .into_iter()
        .find(|xs| xs.name == name)
        .ok_or_else(|| Sg13g2Error::UnknownCrossSection(name.to_string()))
}
