//! Octagonal spiral inductors on the thick top metal.

use std::f64::consts::FRAC_PI_8;

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cells::cut_array;
use crate::layers::Sg13g2Layer;
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{clamp_snap, clean, pt, rect, um, GRID_UM};
use crate::{Result, Sg13g2Error};

/// A two-terminal octagonal spiral inductor.
///
/// The winding runs clockwise on TopMetal2 from the outer turn inwards. Both
/// leads exit to the south; for more than one turn the inner end is brought
/// out under the winding on TopMetal1.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct Inductor2 {
    /// Trace width.
    pub width: f64,
    /// Spacing between adjacent turns.
    pub space: f64,
    /// Inner flat-to-flat diameter.
    pub diameter: f64,
    /// Number of turns.
    pub turns: usize,
}

impl Default for Inductor2 {
    fn default() -> Self {
        Self {
            width: 2.,
            space: 2.1,
            diameter: 25.35,
            turns: 1,
        }
    }
}

impl Inductor2 {
    /// Minimum trace width.
    pub const MIN_WIDTH: f64 = 2.;
    /// Minimum spacing between turns.
    pub const MIN_SPACE: f64 = 2.1;
    /// Minimum inner diameter.
    pub const MIN_DIAMETER: f64 = 15.;

    /// A builder starting from the default inductor.
    #[inline]
    pub fn builder() -> Inductor2Builder {
        Inductor2Builder::default()
    }

    /// The clamped and snapped `(width, space, diameter)`.
    pub fn dims(&self) -> (f64, f64, f64) {
        (
            clamp_snap(self.width, Self::MIN_WIDTH, GRID_UM),
            clamp_snap(self.space, Self::MIN_SPACE, GRID_UM),
            clamp_snap(self.diameter, Self::MIN_DIAMETER, GRID_UM),
        )
    }

    /// The outer flat-to-flat diameter of the winding.
    pub fn outer_diameter(&self) -> f64 {
        let (w, s, d) = self.dims();
        clean(d + 2. * self.turns as f64 * w + 2. * (self.turns.max(1) - 1) as f64 * s)
    }
}

impl Block for Inductor2 {
    fn name(&self) -> ArcStr {
        cell_name("inductor2", self)
    }
}

/// The vertices of an open octagon of centre-line apothem `a`, clockwise from
/// `(-gap / 2, -a)` to `(gap / 2, -a)`.
fn open_octagon(a: f64, gap: f64) -> Vec<Point> {
    let h = a * FRAC_PI_8.tan();
    [
        (-gap / 2., -a),
        (-h, -a),
        (-a, -h),
        (-a, h),
        (-h, a),
        (h, a),
        (a, h),
        (a, -h),
        (h, -a),
        (gap / 2., -a),
    ]
    .into_iter()
    .map(|(x, y)| pt(x, y))
    .collect()
}

impl Layout for Inductor2 {
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        if self.turns == 0 {
            return Err(Sg13g2Error::invalid_param("turns", "must be at least 1"));
        }
        let (w, s, d) = self.dims();
        let pitch = w + s;
        let gap = pitch;
        let n = self.turns;
        // Centre-line apothem of turn `k`, counted from the outside.
        let apothem = |k: usize| d / 2. + w / 2. + (n - 1 - k) as f64 * pitch;
        let a0 = apothem(0);
        let lead = pitch + w;

        for k in 0..n {
            cell.draw(
                Sg13g2Layer::TopMetal2,
                Polygon::from_path(&open_octagon(apothem(k), gap), um(w)),
            );
            if k + 1 < n {
                cell.draw(
                    Sg13g2Layer::TopMetal2,
                    Polygon::from_path(
                        &[pt(gap / 2., -apothem(k)), pt(-gap / 2., -apothem(k + 1))],
                        um(w),
                    ),
                );
            }
        }

        let lead_bot = -a0 - lead;
        cell.draw(
            Sg13g2Layer::TopMetal2,
            rect(-gap / 2. - w / 2., lead_bot, -gap / 2. + w / 2., -a0 + w / 2.),
        );

        if n == 1 {
            cell.draw(
                Sg13g2Layer::TopMetal2,
                rect(gap / 2. - w / 2., lead_bot, gap / 2. + w / 2., -a0 + w / 2.),
            );
        } else {
            let inner = apothem(n - 1);
            let stub_top = lead_bot + w;
            cell.draw(
                Sg13g2Layer::TopMetal1,
                rect(gap / 2. - w / 2., lead_bot, gap / 2. + w / 2., -inner + w / 2.),
            );
            cell.draw(
                Sg13g2Layer::TopMetal2,
                rect(gap / 2. - w / 2., lead_bot, gap / 2. + w / 2., stub_top),
            );
            let via = *cell.rules().cut(Sg13g2Layer::TopVia2)?;
            let count = via.count(w);
            let offset = (count - 1) as f64 * via.pitch() / 2.;
            for y in [-inner, lead_bot + w / 2.] {
                cut_array(
                    cell,
                    Sg13g2Layer::TopVia2,
                    gap / 2. - offset,
                    y - offset,
                    count,
                    count,
                    via.size,
                    via.pitch(),
                );
            }
        }

        if let Some(bbox) = cell.bbox() {
            let region = bbox.expand_all(um(s));
            cell.draw(Sg13g2Layer::Ind, region);
            for metal in Sg13g2Layer::METALS {
                cell.draw(metal.nofill(), region);
            }
        }

        cell.add_port("P1", pt(-gap / 2., lead_bot), um(w), Rotation::R270, Sg13g2Layer::TopMetal2)?;
        cell.add_port("P2", pt(gap / 2., lead_bot), um(w), Rotation::R270, Sg13g2Layer::TopMetal2)?;

        let outer = self.outer_diameter();
        let info = cell.info_mut();
        info.insert("model", "inductor2");
        info.insert("turns", n);
        info.insert("diameter", d);
        info.insert("width", w);
        info.insert("space", s);
        info.insert("outer_diameter", outer);
        Ok(())
    }
}
