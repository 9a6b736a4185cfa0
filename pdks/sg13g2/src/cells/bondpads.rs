//! Bondpads for wire bonding and flip-chip attachment.

use std::f64::consts::SQRT_2;
use std::fmt;

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::layers::Sg13g2Layer;
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{pt, rect_centered, snap2x_um, snap_um, um, GRID_UM};
use crate::{Result, Sg13g2Error};

/// Grid of the pad diameter.
pub const PAD_GRID: f64 = 0.01;

/// Passivation opening relative to the pad size.
const OPENING_SCALE: f64 = 0.85;
/// Under-bump metallization relative to the pad size.
const UBM_SCALE: f64 = 0.7;
const CIRCLE_RESOLUTION_DEG: f64 = 2.5;

/// The outline of a bondpad.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadShape {
    /// Flat-edged octagon.
    #[default]
    Octagon,
    /// Axis-aligned square.
    Square,
    /// Polygonal approximation of a circle.
    Circle,
}

impl fmt::Display for PadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Octagon => "octagon",
            Self::Square => "square",
            Self::Circle => "circle",
        };
        write!(f, "{s}")
    }
}

impl PadShape {
    /// The outline of a pad of extent `d` centered at the origin.
    ///
    /// Octagons are sized so that their flat-to-flat extent is `d`.
    fn outline(&self, d: f64) -> Result<Shape> {
        let too_small = || {
            Sg13g2Error::invalid_param("diameter", arcstr::format!("{d} um is too small"))
        };
        if um(d) <= 0 {
            return Err(too_small());
        }
        Ok(match self {
            Self::Octagon => {
                let side = snap2x_um(d / (1. + SQRT_2), GRID_UM);
                if um(side) <= 0 {
                    return Err(too_small());
                }
                Polygon::regular_octagon(Point::zero(), um(side)).into()
            }
            Self::Square => rect_centered(0., 0., d, d).into(),
            Self::Circle => {
                Polygon::circle(Point::zero(), um(d / 2.), CIRCLE_RESOLUTION_DEG).into()
            }
        })
    }
}

/// A single bondpad.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Bondpad {
    /// The pad outline.
    pub shape: PadShape,
    /// Repeat the pad on every metal from `bottom_metal` up to `top_metal`.
    pub stack_metals: bool,
    /// Add under-bump metallization.
    pub flip_chip: bool,
    /// Pad extent in micrometres.
    pub diameter: f64,
    /// The metal carrying the pad port.
    pub top_metal: Sg13g2Layer,
    /// The lowest metal of a stacked pad.
    pub bottom_metal: Sg13g2Layer,
}

impl Default for Bondpad {
    fn default() -> Self {
        Self {
            shape: PadShape::Octagon,
            stack_metals: true,
            flip_chip: false,
            diameter: 68.,
            top_metal: Sg13g2Layer::TopMetal2,
            bottom_metal: Sg13g2Layer::Metal1,
        }
    }
}

impl Bondpad {
    /// A builder starting from the default pad.
    #[inline]
    pub fn builder() -> BondpadBuilder {
        BondpadBuilder::default()
    }

    /// The pad extent snapped to [`PAD_GRID`].
    pub fn diameter(&self) -> f64 {
        snap_um(self.diameter, PAD_GRID)
    }
}

impl Block for Bondpad {
    fn name(&self) -> ArcStr {
        cell_name("bondpad", self)
    }
}

impl Layout for Bondpad {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let d = self.diameter();
        if d <= 0. {
            return Err(Sg13g2Error::invalid_param("diameter", "must be positive"));
        }
        // Also validates that both layers are metals in the right order.
        let metals = cell.rules().metals_between(self.bottom_metal, self.top_metal)?;

        let pad = self.shape.outline(d)?;
        if self.stack_metals {
            for metal in metals {
                cell.draw(metal, pad.clone());
            }
        } else {
            cell.draw(self.top_metal, pad);
        }

        cell.draw(Sg13g2Layer::DfPad, self.shape.outline(OPENING_SCALE * d)?);

        if self.flip_chip {
            let ubm: Shape = match self.shape {
                PadShape::Circle => self.shape.outline(UBM_SCALE * d)?,
                _ => rect_centered(0., 0., UBM_SCALE * d, UBM_SCALE * d).into(),
            };
            cell.draw(Sg13g2Layer::Ubm, ubm);
        }

        cell.add_port("pad", pt(0., 0.), um(d), Rotation::R0, self.top_metal)?;

        let info = cell.info_mut();
        info.insert("shape", self.shape.to_string());
        info.insert("diameter", self.diameter);
        info.insert("stack_metals", self.stack_metals);
        info.insert("flip_chip", self.flip_chip);
        info.insert("top_metal", self.top_metal.name());
        info.insert("bottom_metal", self.bottom_metal.name());
        Ok(())
    }
}

/// A row of identical bondpads along x.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct BondpadArray {
    /// Number of pads.
    pub n_pads: usize,
    /// Center-to-center pad spacing.
    pub pad_pitch: f64,
    /// Extent of each pad in micrometres.
    pub pad_diameter: f64,
    /// The pad outline.
    pub shape: PadShape,
    /// Repeat each pad on every metal.
    pub stack_metals: bool,
}

impl Default for BondpadArray {
    fn default() -> Self {
        Self {
            n_pads: 4,
            pad_pitch: 100.,
            pad_diameter: 68.,
            shape: PadShape::Octagon,
            stack_metals: true,
        }
    }
}

impl BondpadArray {
    /// A builder starting from the default array.
    #[inline]
    pub fn builder() -> BondpadArrayBuilder {
        BondpadArrayBuilder::default()
    }

    /// The bondpad placed at each position.
    pub fn pad(&self) -> Bondpad {
        Bondpad {
            shape: self.shape,
            stack_metals: self.stack_metals,
            diameter: self.pad_diameter,
            ..Default::default()
        }
    }
}

impl Block for BondpadArray {
    fn name(&self) -> ArcStr {
        cell_name("bondpad_array", self)
    }
}

impl Layout for BondpadArray {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        if self.pad_diameter <= 0. {
            return Err(Sg13g2Error::invalid_param("pad_diameter", "must be positive"));
        }
        if self.n_pads > 1 && self.pad_pitch <= 0. {
            return Err(Sg13g2Error::invalid_param("pad_pitch", "must be positive"));
        }
        let pad = cell.generate(&self.pad())?;
        for i in 0..self.n_pads {
            let x = um(i as f64 * self.pad_pitch);
            let trans = Transformation::translate(x, 0);
            cell.instantiate(pad, arcstr::format!("pad{i}"), trans)?;
            if let Some(port) = cell.child_port(pad, "pad", trans) {
                cell.add_raw_port(arcstr::format!("pad_{}", i + 1), port)?;
            }
        }

        let info = cell.info_mut();
        info.insert("n_pads", self.n_pads);
        info.insert("pad_pitch", self.pad_pitch);
        info.insert("pad_diameter", self.pad_diameter);
        Ok(())
    }
}
