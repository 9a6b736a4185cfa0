//! Parametric layout cells.
//!
//! Parameters are in micrometres. Each cell clamps its dimensions to the
//! device minimums and snaps them to its grid before drawing.

pub mod bjt;
pub mod bondpads;
pub mod capacitors;
pub mod inductors;
pub mod resistors;
pub mod taps;
pub mod vias;

pub use bjt::Npn13G2;
pub use bondpads::{Bondpad, BondpadArray, PadShape};
pub use capacitors::{Cmim, Rfcmim};
pub use inductors::Inductor2;
pub use resistors::{Rhigh, Rppd, Rsil};
pub use taps::{Ntap1, Ptap1};
pub use vias::ViaStack;

use crate::layers::LayerPurpose;
use crate::layout::CellBuilder;
use crate::units::rect_centered;

/// Draws an `nx` by `ny` array of square cuts of edge `size`.
///
/// `(x0, y0)` is the centre of the lower-left cut; cuts are stepped by `pitch`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cut_array(
    cell: &mut CellBuilder<'_>,
    layer: impl Into<LayerPurpose>,
    x0: f64,
    y0: f64,
    nx: usize,
    ny: usize,
    size: f64,
    pitch: f64,
) {
    let layer = layer.into();
    for i in 0..nx {
        for j in 0..ny {
            let x = x0 + i as f64 * pitch;
            let y = y0 + j as f64 * pitch;
            cell.draw(layer, rect_centered(x, y, size, size));
        }
    }
}

/// The number of cuts of `size` at `pitch` fitting in `span` with `enc` on both ends.
#[inline]
pub(crate) fn cut_count(span: f64, enc: f64, size: f64, pitch: f64) -> usize {
    let n = (span - 2. * enc - size) / pitch + 1e-9;
    if n < 0. {
        1
    } else {
        n as usize + 1
    }
}
