//! Polysilicon resistors.
//!
//! All three resistors share a layout: a GatPoly body of `length` by `width`,
//! contacted poly end regions, Metal1 terminals and a RES marker. They differ
//! in their implant and marker layers and their sheet resistance.

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::layers::Sg13g2Layer;
use crate::layout::{cell_name, Block, CellBuilder, Layout};
use crate::units::{clamp_snap, clean, pt, rect_centered, rect_ll, um, GRID_UM};
use crate::Result;

const CONT_SIZE: f64 = 0.16;
const CONT_SPACE: f64 = 0.18;
const CONT_ENC: f64 = 0.07;
const METAL_ENC: f64 = 0.06;

/// The process flavour of a poly resistor.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResistorKind {
    /// Silicided poly.
    Rsil,
    /// P+ poly.
    Rppd,
    /// High-resistance poly.
    Rhigh,
}

impl ResistorKind {
    /// Minimum body width.
    pub fn min_width(&self) -> f64 {
        match self {
            Self::Rsil | Self::Rppd => 0.4,
            Self::Rhigh => 1.4,
        }
    }

    /// Minimum body length.
    pub fn min_length(&self) -> f64 {
        match self {
            Self::Rsil | Self::Rppd => 0.8,
            Self::Rhigh => 5.,
        }
    }

    /// Sheet resistance in ohm/square.
    pub fn sheet_resistance(&self) -> f64 {
        match self {
            Self::Rsil => 7.,
            Self::Rppd => 300.,
            Self::Rhigh => 1350.,
        }
    }

    /// Length of the contacted poly beyond each end of the body.
    pub fn end_extension(&self) -> f64 {
        match self {
            Self::Rsil | Self::Rppd => 0.4,
            Self::Rhigh => 0.8,
        }
    }

    fn contact_columns(&self) -> usize {
        match self {
            Self::Rsil | Self::Rppd => 1,
            Self::Rhigh => 2,
        }
    }

    fn res_marker_margin(&self) -> f64 {
        match self {
            Self::Rsil | Self::Rppd => 0.5,
            Self::Rhigh => 1.,
        }
    }

    /// The catalog name, also the default model name.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Rsil => "rsil",
            Self::Rppd => "rppd",
            Self::Rhigh => "rhigh",
        }
    }
}

macro_rules! poly_resistor {
    ($(#[$meta:meta])* $name:ident, $builder:ident, $kind:expr, $width:expr, $length:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
        #[builder(default)]
        #[serde(default)]
        pub struct $name {
            /// Body extent in y.
            pub width: f64,
            /// Body extent in x.
            pub length: f64,
            /// Resistance in ohms. Computed from the number of squares when unset.
            #[builder(setter(strip_option))]
            pub resistance: Option<f64>,
            /// Device model name recorded in the cell info.
            #[builder(setter(into))]
            pub model: ArcStr,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    width: $width,
                    length: $length,
                    resistance: None,
                    model: ArcStr::from($kind.base_name()),
                }
            }
        }

        impl $name {
            /// The resistor flavour.
            pub const KIND: ResistorKind = $kind;

            /// A builder starting from the default resistor.
            #[inline]
            pub fn builder() -> $builder {
                $builder::default()
            }

            fn params(&self) -> PolyResistor {
                PolyResistor::new(Self::KIND, self.width, self.length, self.resistance)
            }

            /// The clamped and snapped `(width, length)`.
            pub fn dims(&self) -> (f64, f64) {
                let p = self.params();
                (p.width, p.length)
            }

            /// The resistance in ohms.
            pub fn resistance(&self) -> f64 {
                self.params().resistance
            }
        }

        impl Block for $name {
            fn name(&self) -> ArcStr {
                cell_name(Self::KIND.base_name(), self)
            }
        }

        impl Layout for $name {
            fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
                self.params().draw(cell)?;
                cell.info_mut().insert("model", self.model.clone());
                Ok(())
            }
        }
    };
}

poly_resistor!(
    /// A silicided polysilicon resistor.
    Rsil,
    RsilBuilder,
    ResistorKind::Rsil,
    0.8,
    0.5
);
poly_resistor!(
    /// A P+ polysilicon resistor.
    Rppd,
    RppdBuilder,
    ResistorKind::Rppd,
    0.8,
    10.
);
poly_resistor!(
    /// A high-resistance polysilicon resistor in an N-well.
    Rhigh,
    RhighBuilder,
    ResistorKind::Rhigh,
    1.4,
    20.
);

/// Resolved resistor dimensions.
struct PolyResistor {
    kind: ResistorKind,
    width: f64,
    length: f64,
    resistance: f64,
}

impl PolyResistor {
    fn new(kind: ResistorKind, width: f64, length: f64, resistance: Option<f64>) -> Self {
        let width = clamp_snap(width, kind.min_width(), GRID_UM);
        let length = clamp_snap(length, kind.min_length(), GRID_UM);
        let resistance =
            resistance.unwrap_or_else(|| clean(length / width * kind.sheet_resistance()));
        Self {
            kind,
            width,
            length,
            resistance,
        }
    }

    fn draw(&self, cell: &mut CellBuilder<'_>) -> Result<()> {
        let (w, l) = (self.width, self.length);
        let ext = self.kind.end_extension();

        match self.kind {
            ResistorKind::Rsil => {
                cell.draw(Sg13g2Layer::SalBlock, rect_centered(0., 0., l + 0.2, w + 0.2));
            }
            ResistorKind::Rppd => {
                cell.draw(Sg13g2Layer::PSd, rect_centered(0., 0., l + 2. * ext, w + 0.2));
                cell.draw(Sg13g2Layer::PolyRes, rect_centered(0., 0., l, w));
            }
            ResistorKind::Rhigh => {
                cell.draw(
                    Sg13g2Layer::NWell,
                    rect_centered(0., 0., l + 2. * ext + 1., w + 1.),
                );
                cell.draw(Sg13g2Layer::PolyRes, rect_centered(0., 0., l + 0.2, w + 0.2));
            }
        }

        cell.draw(Sg13g2Layer::GatPoly, rect_centered(0., 0., l, w));
        cell.draw(Sg13g2Layer::GatPoly, rect_ll(-(l / 2. + ext), -w / 2., ext, w));
        cell.draw(Sg13g2Layer::GatPoly, rect_ll(l / 2., -w / 2., ext, w));

        let pitch = CONT_SIZE + CONT_SPACE;
        let ny = ((w - CONT_SIZE) / pitch + 1e-9).floor() as usize + 1;
        for col in 0..self.kind.contact_columns() {
            let (left, right) = match self.kind {
                ResistorKind::Rhigh => {
                    let x_off = col as f64 * pitch;
                    (
                        -(l / 2. + ext - CONT_ENC - x_off),
                        l / 2. + ext - CONT_ENC - CONT_SIZE - x_off,
                    )
                }
                _ => (
                    -(l / 2. + ext / 2.) - CONT_SIZE / 2.,
                    (l / 2. + ext / 2.) - CONT_SIZE / 2.,
                ),
            };
            for j in 0..ny {
                let y = -w / 2. + CONT_ENC + j as f64 * pitch;
                cell.draw(Sg13g2Layer::Cont, rect_ll(left, y, CONT_SIZE, CONT_SIZE));
                cell.draw(Sg13g2Layer::Cont, rect_ll(right, y, CONT_SIZE, CONT_SIZE));
            }
        }

        let m1_w = ext + 2. * METAL_ENC;
        let m1_h = w + 2. * METAL_ENC;
        cell.draw(
            Sg13g2Layer::Metal1,
            rect_ll(-(l / 2. + ext + METAL_ENC), -w / 2. - METAL_ENC, m1_w, m1_h),
        );
        cell.draw(
            Sg13g2Layer::Metal1,
            rect_ll(l / 2. - METAL_ENC, -w / 2. - METAL_ENC, m1_w, m1_h),
        );

        let margin = self.kind.res_marker_margin();
        cell.draw(
            Sg13g2Layer::Res,
            rect_centered(0., 0., l + 2. * ext + margin, w + margin),
        );

        cell.add_port("P1", pt(-(l / 2. + ext), 0.), um(w), Rotation::R180, Sg13g2Layer::Metal1)?;
        cell.add_port("P2", pt(l / 2. + ext, 0.), um(w), Rotation::R0, Sg13g2Layer::Metal1)?;

        let info = cell.info_mut();
        info.insert("width", w);
        info.insert("length", l);
        info.insert("resistance", self.resistance);
        info.insert("sheet_resistance", self.kind.sheet_resistance());
        info.insert("n_squares", clean(l / w));
        Ok(())
    }
}
