//! SiGe heterojunction bipolar transistors.

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::layers::{Purpose, Sg13g2Layer};
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{clean, polygon, pt, rect, rect_ll, snap_um, to_um, um};
use crate::{Result, Sg13g2Error};

/// Horizontal pitch of emitter fingers.
pub const FINGER_PITCH: f64 = 1.85;

/// Grid for port widths.
const PORT_GRID: f64 = 0.002;

const VIA1_SIZE: f64 = 0.19;
const VIA1_ROWS: usize = 4;
const VIA1_STEP_Y: f64 = 0.41;

/// The npn13G2 high-speed HBT.
///
/// Emitter fingers are placed along x at [`FINGER_PITCH`]. The collector
/// contact runs above the emitters, the base contact below, and the emitters
/// are strapped together on Metal2.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Npn13G2 {
    /// Base poly extension beyond the emitter window in x.
    pub baspolyx: f64,
    /// Bipolar window enclosure of the emitter in x.
    pub bipwinx: f64,
    /// Bipolar window enclosure of the emitter in y.
    pub bipwiny: f64,
    /// Emitter poly enclosure of the emitter window in x.
    pub empolyx: f64,
    /// Emitter poly enclosure of the emitter window in y.
    pub empolyy: f64,
    /// Shallow trench isolation width.
    #[serde(rename = "STI")]
    pub sti: f64,
    /// Emitter window extent in y.
    pub emitter_length: f64,
    /// Emitter window extent in x.
    pub emitter_width: f64,
    /// Number of emitter fingers.
    #[serde(rename = "Nx")]
    pub nx: usize,
    /// Number of emitter rows. Only a single row is supported.
    #[serde(rename = "Ny")]
    pub ny: usize,
    /// Device label placed on the TEXT layer.
    #[builder(setter(into))]
    pub text: ArcStr,
}

impl Default for Npn13G2 {
    fn default() -> Self {
        Self {
            baspolyx: 0.3,
            bipwinx: 0.07,
            bipwiny: 0.1,
            empolyx: 0.15,
            empolyy: 0.18,
            sti: 0.44,
            emitter_length: 0.9,
            emitter_width: 0.7,
            nx: 1,
            ny: 1,
            text: arcstr::literal!("npn13G2"),
        }
    }
}

impl Npn13G2 {
    /// A builder starting from the default transistor.
    #[inline]
    pub fn builder() -> Npn13G2Builder {
        Npn13G2Builder::default()
    }

    /// Horizontal distance between the first and last emitter finger.
    pub fn stretch(&self) -> f64 {
        FINGER_PITCH * (self.nx.max(1) - 1) as f64
    }

    /// Vertical growth of the device over the default window and poly overlaps.
    fn y_offset(&self) -> f64 {
        (self.bipwiny - 0.1) + (self.empolyy - 0.18)
    }

    /// Horizontal growth of the active bar over the default overlaps.
    fn x_offset(&self) -> f64 {
        (self.empolyx - 0.15) + (self.baspolyx - 0.3) + (self.sti - 0.44)
    }
}

impl Block for Npn13G2 {
    fn name(&self) -> ArcStr {
        cell_name("npn13G2", self)
    }
}

impl Layout for Npn13G2 {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        if self.nx == 0 || self.ny == 0 {
            return Err(Sg13g2Error::invalid_param(
                "Nx",
                "at least one emitter finger is required",
            ));
        }
        let le = self.emitter_width;
        let we = self.emitter_length;
        let o = self.y_offset();
        let xo = self.x_offset();
        let stretch = self.stretch();
        let nsd_shift = 0.43 - le;

        for i in 0..self.nx {
            let px = FINGER_PITCH * i as f64;

            for j in 0..VIA1_ROWS {
                let bot = 0.5 + o - j as f64 * VIA1_STEP_Y + 0.2 - VIA1_SIZE;
                for left in [px - 0.3, px + 0.11] {
                    cell.draw(Sg13g2Layer::Via1, rect_ll(left, bot, VIA1_SIZE, VIA1_SIZE));
                }
            }

            // Emitter contact.
            cell.draw(
                Sg13g2Layer::Metal1,
                rect(px - 0.35, -(0.335 + we / 2. + o), px + 0.35, 0.32 + we / 2. + o),
            );

            // Collector and base contact bars.
            cell.draw(
                Sg13g2Layer::Cont,
                rect(
                    px - 0.79 - le / 2.,
                    0.6 + we / 2. + o,
                    px + 0.79 + le / 2.,
                    0.76 + we / 2. + o,
                ),
            );
            cell.draw(
                Sg13g2Layer::Cont,
                rect(px - 0.76, -(0.77 + we / 2. - o), px + 0.76, -(0.61 + we / 2. - o)),
            );

            cell.draw(
                Sg13g2Layer::EmWind,
                rect(px - le / 2., -we / 2., px + le / 2., we / 2.),
            );

            let xl = px - 0.06;
            let xh = xl + 0.12;
            cell.draw(
                Sg13g2Layer::Activ.with_purpose(Purpose::Mask),
                polygon(&[
                    (xh + 0.865, 0.98),
                    (xl - 0.865, 0.98),
                    (xl - 0.865, -0.62),
                    (xl - 0.385, -0.62),
                    (xl - 0.175, -0.83),
                    (xh + 0.175, -0.83),
                    (xh + 0.385, -0.62),
                    (xh + 0.865, -0.62),
                ]),
            );

            cell.draw(
                Sg13g2Layer::Activ,
                rect(
                    px - 0.89 - le / 2. - xo,
                    0.53 + we / 2. + o,
                    px + 0.89 + le / 2. + xo,
                    0.83 + we / 2. + o,
                ),
            );

            let (r, l) = (px + le / 2. + xo, px - le / 2. - xo);
            let upper = 0.6 + we / 2. - o - nsd_shift;
            let upper_notch = 0.85 + we / 2. - o - nsd_shift;
            cell.draw(
                Sg13g2Layer::NSd.with_purpose(Purpose::Block),
                polygon(&[
                    (r + 0.94, -(1.98 + we / 2. + o)),
                    (r + 0.94, -(0.45 + we / 2. + o)),
                    (r + 0.52, -(0.03 + we / 2. + o)),
                    (r + 0.52, upper),
                    (r + 0.27, upper_notch),
                    (l - 0.27, upper_notch),
                    (l - 0.52, upper),
                    (l - 0.52, -(0.03 + we / 2. + o)),
                    (l - 0.94, -(0.45 + we / 2. + o)),
                    (l - 0.94, -(1.98 + we / 2. + o)),
                ]),
            );
        }

        let (c_bot, c_top) = if self.nx > 1 { (0.57, 1.01) } else { (0.56, 0.8) };
        let collector = rect(
            -0.89 - le / 2.,
            c_bot + we / 2. + o,
            stretch + 0.89 + le / 2.,
            c_top + we / 2. + o,
        );
        let base = rect(
            -0.94 - le / 2.,
            -(0.81 + we / 2. + o),
            stretch + 0.94 + le / 2.,
            -(0.57 + we / 2. + o),
        );
        let emitter_strap = rect(
            -0.89 - le / 2.,
            -(0.335 + we / 2. + o),
            stretch + 0.89 + le / 2.,
            0.32 + we / 2. + o,
        );
        let emitter_pin = rect(
            -0.71 - le / 2.,
            -(0.335 + we / 2. + o),
            stretch + 0.71 + le / 2.,
            0.32 + we / 2. + o,
        );
        cell.draw(Sg13g2Layer::Metal1, collector);
        cell.draw(Sg13g2Layer::Metal1, base);
        cell.draw(Sg13g2Layer::Metal2, emitter_strap);

        cell.label(Sg13g2Layer::Text, self.text.clone(), pt(0.015, 1.86 + we / 2. + o));

        let trans_top = 2.43 + we / 2. + o;
        let trans_bot = -1.98 - we / 2. - o;
        cell.draw(
            Sg13g2Layer::Trans,
            rect(-2.45, trans_bot, stretch + 2.45, trans_top),
        );

        // pSD ring around the TRANS region, drawn as a single cut polygon.
        let psd_top = 3.33 + we / 2. + o;
        let psd_bot = -2.88 - we / 2. - o;
        cell.draw(
            Sg13g2Layer::PSd,
            polygon(&[
                (stretch + 3.35, psd_top),
                (stretch + 2.45, psd_top),
                (stretch + 2.45, trans_bot),
                (-2.45, trans_bot),
                (-2.45, trans_top),
                (stretch + 2.45, trans_top),
                (stretch + 2.45, psd_top),
                (-3.35, psd_top),
                (-3.35, psd_bot),
                (stretch + 3.35, psd_bot),
            ]),
        );

        // Substrate contact ring.
        let ring_out_top = 3.13 + we / 2. + o;
        let ring_out_bot = -2.68 - we / 2. - o;
        let ring_in_top = 2.63 + we / 2. + o;
        let ring_in_bot = -2.18 - we / 2. - o;
        cell.draw(
            Sg13g2Layer::Activ,
            polygon(&[
                (stretch + 3.15, ring_out_top),
                (stretch + 2.65, ring_out_top),
                (stretch + 2.65, ring_in_bot),
                (-2.65, ring_in_bot),
                (-2.65, ring_in_top),
                (stretch + 2.65, ring_in_top),
                (stretch + 2.65, ring_out_top),
                (-3.15, ring_out_top),
                (-3.15, ring_out_bot),
                (stretch + 3.15, ring_out_bot),
            ]),
        );

        for (name, layer, r) in [
            ("C", Sg13g2Layer::Metal1, collector),
            ("B", Sg13g2Layer::Metal1, base),
            ("E", Sg13g2Layer::Metal2, emitter_pin),
        ] {
            cell.draw(layer.pin(), r);
            cell.label(Sg13g2Layer::Text, name, r.center());
            let width = snap_um(to_um(r.height()).max(PORT_GRID), PORT_GRID);
            cell.add_port(name, r.center(), um(width), Rotation::R180, layer)?;
        }

        cell.label(
            Sg13g2Layer::Text,
            arcstr::format!("Ae={}*{}*{:.2}*{:.2}", self.nx, self.ny, le, we),
            pt(-1.977, -2.546),
        );

        let info = cell.info_mut();
        info.insert("model", "npn13G2");
        info.insert("Nx", self.nx);
        info.insert("Ny", self.ny);
        info.insert("emitter_width", le);
        info.insert("emitter_length", we);
        info.insert("emitter_area_um2", clean(le * we * (self.nx * self.ny) as f64));
        Ok(())
    }
}
