//! Conversion between micrometre parameters and 1 nm database units.

use geometry::prelude::*;

/// Database units per micrometre.
pub const DBU_PER_UM: f64 = 1000.;

/// The manufacturing grid, in micrometres.
pub const GRID_UM: f64 = 0.005;

/// Converts a length in micrometres to database units, rounding to the nearest unit.
#[inline]
pub fn um(x: f64) -> i64 {
    (x * DBU_PER_UM).round() as i64
}

/// Converts a length in database units to micrometres.
#[inline]
pub fn to_um(x: i64) -> f64 {
    x as f64 / DBU_PER_UM
}

/// Snaps a micrometre value to the nearest multiple of `grid`.
///
/// The result is rounded to 1 pm to strip floating point noise.
pub fn snap_um(x: f64, grid: f64) -> f64 {
    clean((x / grid).round() * grid)
}

/// Snaps a micrometre value to the nearest multiple of twice `grid`.
///
/// Used for dimensions that are later halved, such as centred octagon sides.
pub fn snap2x_um(x: f64, grid: f64) -> f64 {
    snap_um(x, 2. * grid)
}

/// Clamps `x` to at least `min` and snaps it to `grid`.
pub fn clamp_snap(x: f64, min: f64, grid: f64) -> f64 {
    snap_um(x.max(min), grid)
}

/// Rounds to 1e-9 to remove accumulated floating point error.
#[inline]
pub fn clean(x: f64) -> f64 {
    (x * 1e9).round() / 1e9
}

/// A point given in micrometres.
#[inline]
pub fn pt(x: f64, y: f64) -> Point {
    Point::new(um(x), um(y))
}

/// A rectangle given by its sides in micrometres.
#[inline]
pub fn rect(left: f64, bot: f64, right: f64, top: f64) -> Rect {
    Rect::new(pt(left, bot), pt(right, top))
}

/// A rectangle given by its lower-left corner and size in micrometres.
#[inline]
pub fn rect_ll(x: f64, y: f64, w: f64, h: f64) -> Rect {
    rect(x, y, x + w, y + h)
}

/// A rectangle given by its centre and size in micrometres.
#[inline]
pub fn rect_centered(cx: f64, cy: f64, w: f64, h: f64) -> Rect {
    Rect::from_center_dims(pt(cx, cy), um(w), um(h))
}

/// A polygon from vertices given in micrometres.
pub fn polygon(points: &[(f64, f64)]) -> Polygon {
    Polygon::from_verts(points.iter().map(|&(x, y)| pt(x, y)).collect())
}
