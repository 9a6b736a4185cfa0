//! Via stacks between routing metals.

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cells::cut_array;
use crate::layers::Sg13g2Layer;
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{clamp_snap, pt, rect_centered, um, GRID_UM};
use crate::{Result, Sg13g2Error};

/// A square via stack connecting `bottom` to `top` through every metal in between.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct ViaStack {
    /// The lowest metal.
    pub bottom: Sg13g2Layer,
    /// The highest metal.
    pub top: Sg13g2Layer,
    /// Edge length of the metal squares.
    pub size: f64,
}

impl Default for ViaStack {
    fn default() -> Self {
        Self {
            bottom: Sg13g2Layer::Metal1,
            top: Sg13g2Layer::Metal5,
            size: 1.,
        }
    }
}

impl ViaStack {
    /// A builder starting from the default stack.
    #[inline]
    pub fn builder() -> ViaStackBuilder {
        ViaStackBuilder::default()
    }
}

impl Block for ViaStack {
    fn name(&self) -> ArcStr {
        cell_name("via_stack", self)
    }
}

impl Layout for ViaStack {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let rules = cell.rules().clone();
        let metals = rules.metals_between(self.bottom, self.top)?;
        let size = clamp_snap(self.size, 0., GRID_UM);

        for metal in metals.iter().copied() {
            let min_width = rules.metal(metal)?.min_width;
            if size < min_width {
                return Err(Sg13g2Error::invalid_param(
                    "size",
                    arcstr::format!("{size} is below the minimum {metal} width of {min_width}"),
                ));
            }
            cell.draw(metal, rect_centered(0., 0., size, size));
        }

        for below in metals.iter().take(metals.len().saturating_sub(1)).copied() {
            let Some((cut, rule)) = rules.cut_above(below) else {
                return Err(Sg13g2Error::NoRule(below));
            };
            let enc = rule.enc_below.max(rule.enc_above);
            if size < rule.size + 2. * enc {
                return Err(Sg13g2Error::invalid_param(
                    "size",
                    arcstr::format!("{size} cannot enclose a {cut} cut"),
                ));
            }
            let n = rule.count(size);
            let first = -((n - 1) as f64) * rule.pitch() / 2.;
            cut_array(cell, cut, first, first, n, n, rule.size, rule.pitch());
        }

        cell.add_port("bottom", pt(0., 0.), um(size), Rotation::R0, self.bottom)?;
        cell.add_port("top", pt(0., 0.), um(size), Rotation::R0, self.top)?;

        let info = cell.info_mut();
        info.insert("bottom", self.bottom.name());
        info.insert("top", self.top.name());
        info.insert("size", size);
        Ok(())
    }
}
