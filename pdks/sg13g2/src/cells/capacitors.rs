//! Metal-insulator-metal capacitors.

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cells::{cut_array, cut_count};
use crate::layers::{Purpose, Sg13g2Layer};
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{clamp_snap, clean, pt, rect_centered, rect_ll, um, GRID_UM};
use crate::Result;

/// MIM capacitance density in fF/um^2.
pub const CAP_DENSITY: f64 = 1.5;

const VIA_SIZE: f64 = 0.26;
const VIA_PITCH: f64 = 0.36;

/// A MIM capacitor between a Metal4 bottom plate and a Metal5 top plate.
///
/// The bottom plate connects to the west through a Metal4 extension; the top
/// plate connects to the east through TopVia1 to TopMetal1.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Cmim {
    /// Plate extent in y.
    pub width: f64,
    /// Plate extent in x.
    pub length: f64,
    /// Capacitance in fF. Computed from the plate area when unset.
    #[builder(setter(strip_option))]
    pub capacitance: Option<f64>,
    /// Device model name recorded in the cell info.
    #[builder(setter(into))]
    pub model: ArcStr,
}

impl Default for Cmim {
    fn default() -> Self {
        Self {
            width: 5.,
            length: 5.,
            capacitance: None,
            model: arcstr::literal!("cmim"),
        }
    }
}

impl Cmim {
    /// Minimum plate extent.
    pub const MIN_SIZE: f64 = 0.5;
    /// Enclosure of the MIM plate by the bottom plate.
    pub const PLATE_ENCLOSURE: f64 = 0.2;
    /// Enclosure of the plate vias by the MIM plate.
    pub const VIA_ENCLOSURE: f64 = 0.1;

    /// A builder starting from the default capacitor.
    #[inline]
    pub fn builder() -> CmimBuilder {
        CmimBuilder::default()
    }

    /// The clamped and snapped `(width, length)`.
    pub fn dims(&self) -> (f64, f64) {
        (
            clamp_snap(self.width, Self::MIN_SIZE, GRID_UM),
            clamp_snap(self.length, Self::MIN_SIZE, GRID_UM),
        )
    }

    /// The capacitance in fF.
    pub fn capacitance(&self) -> f64 {
        let (w, l) = self.dims();
        self.capacitance.unwrap_or_else(|| clean(w * l * CAP_DENSITY))
    }
}

impl Block for Cmim {
    fn name(&self) -> ArcStr {
        cell_name("cmim", self)
    }
}

impl Layout for Cmim {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let (w, l) = self.dims();
        let bpl = l + 2. * Self::PLATE_ENCLOSURE;
        let bpw = w + 2. * Self::PLATE_ENCLOSURE;

        cell.draw(Sg13g2Layer::Metal4, rect_centered(0., 0., bpl, bpw));
        cell.draw(Sg13g2Layer::Mim, rect_centered(0., 0., l, w));
        cell.draw(Sg13g2Layer::Metal5, rect_centered(0., 0., l, w));
        draw_plate_vias(cell, w, l, Self::VIA_ENCLOSURE);

        // Bottom plate lead, extending 1 um west of the plate.
        cell.draw(
            Sg13g2Layer::Metal4,
            rect_ll(-bpl / 2. - 1., -0.5, Self::PLATE_ENCLOSURE + 1., 1.),
        );
        // Top plate tab with the via up to TopMetal1.
        cell.draw(Sg13g2Layer::Metal5, rect_ll(l / 2., -0.5, 1., 1.));
        cell.draw(Sg13g2Layer::TopVia1, rect_centered(l / 2. + 0.5, 0., 0.9, 0.9));
        cell.draw(Sg13g2Layer::TopMetal1, rect_centered(l / 2. + 0.5, 0., 1.2, 1.2));

        cell.draw(Sg13g2Layer::MemCap, rect_centered(0., 0., bpl + 0.5, bpw + 0.5));
        cell.draw(
            Sg13g2Layer::Metal4.with_purpose(Purpose::NoFill),
            rect_centered(0., 0., bpl + 1., bpw + 1.),
        );

        cell.add_port("P1", pt(-(bpl / 2. + 0.5), 0.), um(1.), Rotation::R180, Sg13g2Layer::Metal4)?;
        cell.add_port("P2", pt(l / 2. + 0.5, 0.), um(1.), Rotation::R0, Sg13g2Layer::TopMetal1)?;

        let info = cell.info_mut();
        info.insert("model", self.model.clone());
        info.insert("width", w);
        info.insert("length", l);
        info.insert("capacitance_fF", self.capacitance());
        info.insert("area_um2", clean(w * l));
        Ok(())
    }
}

/// A MIM capacitor for RF use, surrounded by a Metal3 ground shield.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Rfcmim {
    /// Plate extent in y.
    pub width: f64,
    /// Plate extent in x.
    pub length: f64,
    /// Capacitance in fF. Computed from the plate area when unset.
    #[builder(setter(strip_option))]
    pub capacitance: Option<f64>,
    /// Device model name recorded in the cell info.
    #[builder(setter(into))]
    pub model: ArcStr,
}

impl Default for Rfcmim {
    fn default() -> Self {
        Self {
            width: 10.,
            length: 10.,
            capacitance: None,
            model: arcstr::literal!("rfcmim"),
        }
    }
}

impl Rfcmim {
    /// Minimum plate extent.
    pub const MIN_SIZE: f64 = 5.;
    /// Enclosure of the MIM plate by the bottom plate.
    pub const PLATE_ENCLOSURE: f64 = 0.3;
    /// Enclosure of the plate vias by the MIM plate.
    pub const VIA_ENCLOSURE: f64 = 0.15;
    /// Gap between the bottom plate and the Metal3 shield.
    pub const SHIELD_ENCLOSURE: f64 = 2.;

    /// A builder starting from the default capacitor.
    #[inline]
    pub fn builder() -> RfcmimBuilder {
        RfcmimBuilder::default()
    }

    /// The clamped and snapped `(width, length)`.
    pub fn dims(&self) -> (f64, f64) {
        (
            clamp_snap(self.width, Self::MIN_SIZE, GRID_UM),
            clamp_snap(self.length, Self::MIN_SIZE, GRID_UM),
        )
    }

    /// The capacitance in fF.
    pub fn capacitance(&self) -> f64 {
        let (w, l) = self.dims();
        self.capacitance.unwrap_or_else(|| clean(w * l * CAP_DENSITY))
    }
}

impl Block for Rfcmim {
    fn name(&self) -> ArcStr {
        cell_name("rfcmim", self)
    }
}

impl Layout for Rfcmim {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let (w, l) = self.dims();
        let sl = l + 2. * Self::SHIELD_ENCLOSURE;
        let sw = w + 2. * Self::SHIELD_ENCLOSURE;
        let bpl = l + 2. * Self::PLATE_ENCLOSURE;
        let bpw = w + 2. * Self::PLATE_ENCLOSURE;

        cell.draw(Sg13g2Layer::Metal3, rect_centered(0., 0., sl, sw));
        cell.draw(Sg13g2Layer::Metal4, rect_centered(0., 0., bpl, bpw));
        cell.draw(Sg13g2Layer::Mim, rect_centered(0., 0., l, w));
        cell.draw(Sg13g2Layer::Metal5, rect_centered(0., 0., l, w));
        draw_plate_vias(cell, w, l, Self::VIA_ENCLOSURE);

        // Pads for both plates.
        cell.draw(Sg13g2Layer::Metal4, rect_ll(-(bpl / 2. + 1.), -1., 2., 2.));
        cell.draw(Sg13g2Layer::TopMetal1, rect_ll(l / 2. + 1., -1., 2., 2.));

        // Top plate strap: Metal5 out to TopVia1, TopMetal1 back to the pad.
        cell.draw(Sg13g2Layer::Metal5, rect_ll(l / 2., -0.55, 2.55, 1.1));
        cell.draw(Sg13g2Layer::TopVia1, rect_centered(l / 2. + 2., 0., 0.9, 0.9));
        cell.draw(Sg13g2Layer::TopMetal1, rect_ll(l / 2. + 1., -0.5, 2., 1.));

        cell.draw(Sg13g2Layer::RfPad, rect_centered(-(bpl / 2. + 1.), 0., 3., 3.));
        cell.draw(Sg13g2Layer::RfPad, rect_centered(l / 2. + 2., 0., 3., 3.));
        cell.draw(Sg13g2Layer::MemCap, rect_centered(0., 0., sl, sw));

        cell.add_port("P1", pt(-(bpl / 2. + 1.), 0.), um(2.), Rotation::R180, Sg13g2Layer::Metal4)?;
        cell.add_port("P2", pt(l / 2. + 2., 0.), um(2.), Rotation::R0, Sg13g2Layer::TopMetal1)?;
        cell.add_port("GND", pt(0., -sw / 2.), um(sl), Rotation::R270, Sg13g2Layer::Metal3)?;

        let info = cell.info_mut();
        info.insert("model", self.model.clone());
        info.insert("width", w);
        info.insert("length", l);
        info.insert("capacitance_fF", self.capacitance());
        info.insert("area_um2", clean(w * l));
        info.insert("type", "rf_capacitor");
        Ok(())
    }
}

/// Via4 array joining the top plate to Metal5, inset by `enc` from the MIM edge.
fn draw_plate_vias(cell: &mut CellBuilder<'_>, w: f64, l: f64, enc: f64) {
    let nx = cut_count(l, enc, VIA_SIZE, VIA_PITCH);
    let ny = cut_count(w, enc, VIA_SIZE, VIA_PITCH);
    cut_array(
        cell,
        Sg13g2Layer::Via4,
        -l / 2. + enc + VIA_SIZE / 2.,
        -w / 2. + enc + VIA_SIZE / 2.,
        nx,
        ny,
        VIA_SIZE,
        VIA_PITCH,
    );
}
