//! Substrate and well taps.

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cells::{cut_array, cut_count};
use crate::layers::Sg13g2Layer;
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{clamp_snap, pt, rect_centered, um, GRID_UM};
use crate::Result;

const CONT_SIZE: f64 = 0.16;
const CONT_PITCH: f64 = 0.34;
const CONT_ENC: f64 = 0.07;
/// Smallest Activ region holding one contact.
pub const MIN_SIZE: f64 = CONT_SIZE + 2. * CONT_ENC;
const PSD_ENC: f64 = 0.03;
const NSD_ENC: f64 = 0.03;
const NWELL_ENC: f64 = 0.24;

/// A p+ substrate tap.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Ptap1 {
    /// Tap extent in y.
    pub width: f64,
    /// Tap extent in x.
    pub length: f64,
}

impl Default for Ptap1 {
    fn default() -> Self {
        Self {
            width: 0.78,
            length: 0.78,
        }
    }
}

impl Ptap1 {
    /// A builder starting from the default tap.
    #[inline]
    pub fn builder() -> Ptap1Builder {
        Ptap1Builder::default()
    }
}

impl Block for Ptap1 {
    fn name(&self) -> ArcStr {
        cell_name("ptap1", self)
    }
}

impl Layout for Ptap1 {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let (w, l) = draw_tap(cell, self.width, self.length)?;
        cell.draw(
            Sg13g2Layer::PSd,
            rect_centered(0., 0., l + 2. * PSD_ENC, w + 2. * PSD_ENC),
        );
        cell.info_mut().insert("model", "ptap1");
        Ok(())
    }
}

/// An n+ tap into an N-well.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Ntap1 {
    /// Tap extent in y.
    pub width: f64,
    /// Tap extent in x.
    pub length: f64,
}

impl Default for Ntap1 {
    fn default() -> Self {
        Self {
            width: 0.78,
            length: 0.78,
        }
    }
}

impl Ntap1 {
    /// A builder starting from the default tap.
    #[inline]
    pub fn builder() -> Ntap1Builder {
        Ntap1Builder::default()
    }
}

impl Block for Ntap1 {
    fn name(&self) -> ArcStr {
        cell_name("ntap1", self)
    }
}

impl Layout for Ntap1 {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let (w, l) = draw_tap(cell, self.width, self.length)?;
        cell.draw(
            Sg13g2Layer::NSd,
            rect_centered(0., 0., l + 2. * NSD_ENC, w + 2. * NSD_ENC),
        );
        cell.draw(
            Sg13g2Layer::NWell,
            rect_centered(0., 0., l + 2. * NWELL_ENC, w + 2. * NWELL_ENC),
        );
        cell.info_mut().insert("model", "ntap1");
        Ok(())
    }
}

/// Draws the contacted Activ and Metal1 common to both taps.
///
/// Returns the snapped `(width, length)`.
fn draw_tap(cell: &mut CellBuilder<'_>, width: f64, length: f64) -> Result<(f64, f64)> {
    let w = clamp_snap(width, MIN_SIZE, GRID_UM);
    let l = clamp_snap(length, MIN_SIZE, GRID_UM);
    let region = rect_centered(0., 0., l, w);
    cell.draw(Sg13g2Layer::Activ, region);
    cell.draw(Sg13g2Layer::Metal1, region);

    let nx = cut_count(l, CONT_ENC, CONT_SIZE, CONT_PITCH);
    let ny = cut_count(w, CONT_ENC, CONT_SIZE, CONT_PITCH);
    let x0 = -((nx - 1) as f64) * CONT_PITCH / 2.;
    let y0 = -((ny - 1) as f64) * CONT_PITCH / 2.;
    cut_array(cell, Sg13g2Layer::Cont, x0, y0, nx, ny, CONT_SIZE, CONT_PITCH);

    cell.add_port("tie", pt(0., 0.), um(w), Rotation::R0, Sg13g2Layer::Metal1)?;

    let info = cell.info_mut();
    info.insert("width", w);
    info.insert("length", l);
    info.insert("contacts", nx * ny);
    Ok((w, l))
}
